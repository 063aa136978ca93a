//! Pipeline entry point: chunk, retrieve, augment, prompt, summarize.

use super::adverse_events::{allergy_context, AdverseEventSource, OpenFdaEventClient};
use super::chunker::chunk_texts;
use super::debug::DebugTrace;
use super::embedder::{EmbeddingModel, OpenAiEmbedder};
use super::prompt::build_interaction_prompt;
use super::retrieval::retrieve;
use super::summarizer::SummarizerChain;
use super::types::{PipelineResult, RetrievedContext};
use super::PipelineError;
use crate::config::{ChunkingMode, PipelineConfig};

/// External collaborators for one pipeline run.
///
/// `None` for the embedder selects keyword retrieval; `None` for the
/// adverse-event source skips augmentation.
pub struct PipelineDeps<'a> {
    pub embedder: Option<&'a dyn EmbeddingModel>,
    pub adverse_events: Option<&'a dyn AdverseEventSource>,
    pub summarizer: &'a SummarizerChain,
}

impl<'a> PipelineDeps<'a> {
    /// No embedder and no adverse-event source: only local computation plus
    /// whatever the chain can reach.
    pub fn local(summarizer: &'a SummarizerChain) -> Self {
        Self {
            embedder: None,
            adverse_events: None,
            summarizer,
        }
    }
}

/// Owned production collaborators resolved from configuration.
pub struct LiveServices {
    embedder: Option<OpenAiEmbedder>,
    adverse_events: Option<OpenFdaEventClient>,
    summarizer: SummarizerChain,
}

impl LiveServices {
    /// Build every remote collaborator the configuration allows.
    ///
    /// Construction failures are logged and the collaborator is left out, so
    /// the run degrades to the next fallback.
    pub fn connect(config: &PipelineConfig) -> Self {
        let embedder = match OpenAiEmbedder::from_config(&config.providers, config.http_timeout_secs) {
            Some(Ok(embedder)) => Some(embedder),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Embedder unavailable, keyword retrieval only");
                None
            }
            None => None,
        };

        let adverse_events = match OpenFdaEventClient::public(config.adverse_event_timeout_secs) {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "Adverse-event client unavailable");
                None
            }
        };

        Self {
            embedder,
            adverse_events,
            summarizer: SummarizerChain::from_config(&config.providers, config.http_timeout_secs),
        }
    }

    /// No network collaborators at all. The chain keeps its configured stages.
    pub fn offline(config: &PipelineConfig) -> Self {
        Self {
            embedder: None,
            adverse_events: None,
            summarizer: SummarizerChain::from_config(&config.providers, config.http_timeout_secs),
        }
    }

    pub fn deps(&self) -> PipelineDeps<'_> {
        PipelineDeps {
            embedder: self.embedder.as_ref().map(|e| e as &dyn EmbeddingModel),
            adverse_events: self
                .adverse_events
                .as_ref()
                .map(|a| a as &dyn AdverseEventSource),
            summarizer: &self.summarizer,
        }
    }
}

/// Answer "do these drugs interact?" from raw label texts.
///
/// Every recoverable failure is absorbed into a fallback and recorded in the
/// returned trace. `success` is false only when the summarizer chain cannot
/// produce an answer at all. Retrieval depth is `config.top_k`.
pub fn run_pipeline(
    texts: &[String],
    drugs: &[String],
    config: &PipelineConfig,
    deps: &PipelineDeps<'_>,
) -> PipelineResult {
    let mut trace = DebugTrace::new();

    tracing::info!(
        drugs = ?drugs,
        texts = texts.len(),
        top_k = config.top_k,
        "Running interaction pipeline"
    );

    match execute(texts, drugs, config, deps, &mut trace) {
        Ok(answer) => PipelineResult::answered(answer, trace),
        Err(e) => {
            trace.error(format!("unexpected_error: {e}"));
            PipelineResult::failed(trace)
        }
    }
}

fn execute(
    texts: &[String],
    drugs: &[String],
    config: &PipelineConfig,
    deps: &PipelineDeps<'_>,
    trace: &mut DebugTrace,
) -> Result<String, PipelineError> {
    trace.step("splitting_texts");
    let passages = chunk_texts(texts, config.chunking);
    match config.chunking {
        ChunkingMode::Overlapping { .. } => {
            trace.step(format!("overlapping_split: created {} chunks", passages.len()))
        }
        ChunkingMode::Fixed { .. } => {
            trace.step(format!("naive_split: created {} chunks", passages.len()))
        }
    }

    let retrieved = retrieve(&passages, drugs, config.top_k, deps.embedder, trace);
    let mut context = RetrievedContext::new(retrieved);

    match deps.adverse_events {
        Some(source) => {
            let lines = allergy_context(drugs, source, config.adverse_event_limit, trace);
            if lines.is_empty() {
                trace.note("no_allergy_context_found");
            } else {
                trace.step(format!("allergy_contexts_added: {}", lines.len()));
                context.extend_allergy(lines);
            }
        }
        None => trace.note("adverse_events_skipped"),
    }

    let prompt = build_interaction_prompt(drugs, &context, config.max_context_snippets);
    trace.step("built_prompt_for_llm");

    let summary = deps.summarizer.summarize(&prompt, &context, trace)?;
    tracing::info!(provider = %summary.provider, "Pipeline answered");
    Ok(summary.answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::adverse_events::{AdverseEventError, ReactionReport};
    use crate::pipeline::embedder::MockEmbedder;
    use crate::pipeline::summarizer::{ProviderError, SummaryProvider};

    struct NoReactions;

    impl AdverseEventSource for NoReactions {
        fn source_name(&self) -> &str {
            "openFDA"
        }

        fn query_reactions(
            &self,
            _drug: &str,
            _term: &str,
            _limit: usize,
        ) -> Result<Vec<ReactionReport>, AdverseEventError> {
            Ok(Vec::new())
        }
    }

    struct Refusing;

    impl SummaryProvider for Refusing {
        fn name(&self) -> &str {
            "refusing"
        }

        fn ensure_available(&self) -> Result<(), ProviderError> {
            Ok(())
        }

        fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            Err(ProviderError::EmptyResponse)
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn offline_run_answers_with_rule_based_summary() {
        let chain = SummarizerChain::rule_based_only();
        let config = PipelineConfig::offline();
        let result = run_pipeline(
            &strings(&["Warfarin:\nAnticoagulant. Antibiotic use raises INR."]),
            &strings(&["Warfarin"]),
            &config,
            &PipelineDeps::local(&chain),
        );

        assert!(result.success);
        let answer = result.answer.unwrap();
        assert!(answer.contains("bleeding risk"));
        assert_eq!(result.debug.steps[0], "splitting_texts");
        assert!(result.debug.has_step("overlapping_split: created 1 chunks"));
        assert!(result.debug.has_step("no_embeddings"));
        assert!(result.debug.has_step("built_prompt_for_llm"));
        assert!(result.debug.has_note("adverse_events_skipped"));
    }

    #[test]
    fn fixed_chunking_is_traced_as_naive() {
        let chain = SummarizerChain::rule_based_only();
        let config = PipelineConfig {
            chunking: ChunkingMode::Fixed { window: 1000 },
            ..PipelineConfig::offline()
        };
        let result = run_pipeline(
            &strings(&["a:\nshort"]),
            &strings(&["a"]),
            &config,
            &PipelineDeps::local(&chain),
        );
        assert!(result.debug.has_step("naive_split: created 1 chunks"));
    }

    #[test]
    fn retrieval_depth_comes_from_config() {
        let chain = SummarizerChain::rule_based_only();
        let embedder = MockEmbedder::default();
        let deps = PipelineDeps {
            embedder: Some(&embedder),
            adverse_events: None,
            summarizer: &chain,
        };
        let texts = strings(&["A:\nfirst label", "B:\nsecond label", "C:\nthird label"]);
        let drugs = strings(&["A", "B", "C"]);

        let shallow = PipelineConfig::offline().with_top_k(1);
        let result = run_pipeline(&texts, &drugs, &shallow, &deps);
        assert!(result.debug.has_step("vector_retrieved: 1"));

        let deep = PipelineConfig::offline().with_top_k(3);
        let result = run_pipeline(&texts, &drugs, &deep, &deps);
        assert!(result.debug.has_step("vector_retrieved: 3"));
    }

    #[test]
    fn allergy_lines_reach_the_context() {
        let chain = SummarizerChain::rule_based_only();
        let source = NoReactions;
        let embedder = MockEmbedder::default();
        let deps = PipelineDeps {
            embedder: Some(&embedder),
            adverse_events: Some(&source),
            summarizer: &chain,
        };
        let result = run_pipeline(
            &strings(&["Amoxicillin:\nWARNINGS:\nallergic reactions"]),
            &strings(&["Amoxicillin", "Warfarin"]),
            &PipelineConfig::offline(),
            &deps,
        );

        assert!(result.success);
        assert!(result.debug.has_step("vector_retrieved: 1"));
        assert!(result.debug.has_step("allergy_contexts_added: 2"));
    }

    #[test]
    fn empty_inputs_still_answer() {
        let chain = SummarizerChain::rule_based_only();
        let result = run_pipeline(
            &[],
            &strings(&["X"]),
            &PipelineConfig::offline(),
            &PipelineDeps::local(&chain),
        );
        assert!(result.success);
        assert!(result.answer.unwrap().contains("No major interaction found"));
        assert!(result.debug.has_note("no_context_retrieved_using_all_texts"));
    }

    #[test]
    fn exhausted_chain_fails_the_run() {
        let chain = SummarizerChain::new(vec![Box::new(Refusing)], None);
        let result = run_pipeline(
            &strings(&["a:\ntext"]),
            &strings(&["a"]),
            &PipelineConfig::offline(),
            &PipelineDeps::local(&chain),
        );

        assert!(!result.success);
        assert!(result.answer.is_none());
        assert!(result
            .debug
            .errors
            .last()
            .unwrap()
            .starts_with("unexpected_error:"));
    }

    #[test]
    fn offline_services_have_no_remote_collaborators() {
        let services = LiveServices::offline(&PipelineConfig::offline());
        let deps = services.deps();
        assert!(deps.embedder.is_none());
        assert!(deps.adverse_events.is_none());
        assert_eq!(deps.summarizer.stage_count(), 4);
    }
}
