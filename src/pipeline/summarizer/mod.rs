//! Ordered LLM fallback chain ending in a deterministic rule-based summary.
//!
//! Every provider goes through the same attempt: capability check, invoke,
//! normalize. Any failure is recorded in the trace and the next stage runs.
//! The rule-based stage cannot fail, so a chain built with it always answers.

pub mod openai;
pub mod gemini;
pub mod rule_based;

use thiserror::Error;

use super::debug::DebugTrace;
use super::types::RetrievedContext;
use super::PipelineError;
use crate::config::ProviderConfig;

pub use gemini::GeminiProvider;
pub use openai::OpenAiChatProvider;
pub use rule_based::RuleBasedSummarizer;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("Connection to {0} failed")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Provider returned an empty response")]
    EmptyResponse,

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl ProviderError {
    /// Map a transport error, distinguishing connect and timeout failures.
    ///
    /// The request URL is stripped from the message; it ends up in the
    /// returned trace.
    pub(crate) fn from_reqwest(e: reqwest::Error, base_url: &str, timeout_secs: u64) -> Self {
        if e.is_connect() {
            ProviderError::Connection(base_url.to_string())
        } else if e.is_timeout() {
            ProviderError::Timeout(timeout_secs)
        } else {
            ProviderError::HttpClient(e.without_url().to_string())
        }
    }
}

/// One LLM-backed stage of the chain.
pub trait SummaryProvider {
    /// Stage name used in trace entries, e.g. `openai_chat`.
    fn name(&self) -> &str;

    /// Fail fast when the provider cannot be used (no key, switched off).
    fn ensure_available(&self) -> Result<(), ProviderError>;

    /// Send the prompt and return the raw model text.
    fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Answer produced by the chain and the stage that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub answer: String,
    pub provider: String,
}

pub const RULE_BASED_PROVIDER: &str = "simple_fallback";

pub struct SummarizerChain {
    providers: Vec<Box<dyn SummaryProvider>>,
    fallback: Option<RuleBasedSummarizer>,
}

impl SummarizerChain {
    pub fn new(
        providers: Vec<Box<dyn SummaryProvider>>,
        fallback: Option<RuleBasedSummarizer>,
    ) -> Self {
        Self {
            providers,
            fallback,
        }
    }

    /// The standard chain: OpenAI chat, Gemini, tiered OpenAI, rule-based.
    pub fn from_config(providers: &ProviderConfig, timeout_secs: u64) -> Self {
        let stages: Vec<Box<dyn SummaryProvider>> = vec![
            Box::new(OpenAiChatProvider::from_config(
                "openai_chat",
                providers,
                vec![providers.primary_model.clone()],
                timeout_secs,
            )),
            Box::new(GeminiProvider::from_config(providers, timeout_secs)),
            Box::new(OpenAiChatProvider::from_config(
                "openai_api",
                providers,
                vec![
                    providers.primary_model.clone(),
                    providers.fallback_model.clone(),
                ],
                timeout_secs,
            )),
        ];
        Self::new(stages, Some(RuleBasedSummarizer))
    }

    /// Only the deterministic stage.
    pub fn rule_based_only() -> Self {
        Self::new(Vec::new(), Some(RuleBasedSummarizer))
    }

    pub fn stage_count(&self) -> usize {
        self.providers.len() + usize::from(self.fallback.is_some())
    }

    /// Run the stages in order until one produces an answer.
    pub fn summarize(
        &self,
        prompt: &str,
        context: &RetrievedContext,
        trace: &mut DebugTrace,
    ) -> Result<Summary, PipelineError> {
        if self.stage_count() == 0 {
            return Err(PipelineError::EmptyChain);
        }

        for provider in &self.providers {
            let name = provider.name();
            trace.step(format!("attempting_{name}"));

            match attempt(provider.as_ref(), prompt) {
                Ok(answer) => {
                    trace.step(format!("{name}_success"));
                    tracing::info!(provider = %name, "Summary produced by LLM provider");
                    return Ok(Summary {
                        answer,
                        provider: name.to_string(),
                    });
                }
                Err(e) => trace.stage_error(name, &e),
            }
        }

        match &self.fallback {
            Some(fallback) => {
                let answer = fallback.summarize(&context.snippets());
                trace.note("used_simple_fallback_summary");
                Ok(Summary {
                    answer,
                    provider: RULE_BASED_PROVIDER.to_string(),
                })
            }
            None => Err(PipelineError::ChainExhausted {
                attempts: self.providers.len(),
            }),
        }
    }
}

fn attempt(provider: &dyn SummaryProvider, prompt: &str) -> Result<String, ProviderError> {
    provider.ensure_available()?;
    let raw = provider.generate(prompt)?;
    normalize_answer(&raw)
}

/// Trim model output; blank output counts as a failure.
fn normalize_answer(raw: &str) -> Result<String, ProviderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Scripted provider: fixed outcome, counts invocations.
    struct MockProvider {
        name: &'static str,
        available: bool,
        outcome: Result<String, ProviderError>,
        calls: Cell<usize>,
    }

    impl MockProvider {
        fn answering(name: &'static str, text: &str) -> Self {
            Self {
                name,
                available: true,
                outcome: Ok(text.to_string()),
                calls: Cell::new(0),
            }
        }

        fn failing(name: &'static str, error: ProviderError) -> Self {
            Self {
                name,
                available: true,
                outcome: Err(error),
                calls: Cell::new(0),
            }
        }

        fn unavailable(name: &'static str) -> Self {
            Self {
                available: false,
                ..Self::answering(name, "never")
            }
        }
    }

    impl SummaryProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn ensure_available(&self) -> Result<(), ProviderError> {
            if self.available {
                Ok(())
            } else {
                Err(ProviderError::MissingCredential("TEST_KEY"))
            }
        }

        fn generate(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            self.outcome.clone()
        }
    }

    fn context() -> RetrievedContext {
        RetrievedContext::new(vec!["plain label text".into()])
    }

    #[test]
    fn first_successful_provider_wins() {
        let chain = SummarizerChain::new(
            vec![
                Box::new(MockProvider::failing("first", ProviderError::Timeout(10))),
                Box::new(MockProvider::answering("second", "  Verdict: fine.  ")),
                Box::new(MockProvider::answering("third", "unused")),
            ],
            Some(RuleBasedSummarizer),
        );
        let mut trace = DebugTrace::new();
        let summary = chain.summarize("prompt", &context(), &mut trace).unwrap();

        assert_eq!(summary.provider, "second");
        assert_eq!(summary.answer, "Verdict: fine.");
        assert_eq!(
            trace.steps,
            vec!["attempting_first", "attempting_second", "second_success"]
        );
        assert_eq!(trace.errors, vec!["first_error: Request timed out after 10s"]);
        assert!(trace.notes.is_empty());
    }

    #[test]
    fn unavailable_provider_is_recorded_and_skipped() {
        let skipped = MockProvider::unavailable("skipped");
        let chain = SummarizerChain::new(vec![Box::new(skipped)], Some(RuleBasedSummarizer));
        let mut trace = DebugTrace::new();
        let summary = chain.summarize("prompt", &context(), &mut trace).unwrap();

        assert_eq!(summary.provider, RULE_BASED_PROVIDER);
        assert!(trace.errors[0].contains("TEST_KEY is not set"));
    }

    #[test]
    fn blank_answer_falls_through() {
        let chain = SummarizerChain::new(
            vec![Box::new(MockProvider::answering("blank", "   \n"))],
            Some(RuleBasedSummarizer),
        );
        let mut trace = DebugTrace::new();
        let summary = chain.summarize("prompt", &context(), &mut trace).unwrap();

        assert_eq!(summary.provider, RULE_BASED_PROVIDER);
        assert_eq!(trace.errors, vec!["blank_error: Provider returned an empty response"]);
    }

    #[test]
    fn all_failures_end_in_rule_based_summary() {
        let chain = SummarizerChain::new(
            vec![
                Box::new(MockProvider::failing(
                    "a",
                    ProviderError::Status {
                        status: 429,
                        body: "quota".into(),
                    },
                )),
                Box::new(MockProvider::failing("b", ProviderError::Connection("x".into()))),
            ],
            Some(RuleBasedSummarizer),
        );
        let mut trace = DebugTrace::new();
        let summary = chain.summarize("prompt", &context(), &mut trace).unwrap();

        assert!(summary.answer.contains("No major interaction found"));
        assert_eq!(trace.errors.len(), 2);
        assert!(trace.has_note("used_simple_fallback_summary"));
    }

    #[test]
    fn chain_without_terminal_stage_can_be_exhausted() {
        let chain = SummarizerChain::new(
            vec![Box::new(MockProvider::failing("only", ProviderError::EmptyResponse))],
            None,
        );
        let mut trace = DebugTrace::new();
        let err = chain.summarize("prompt", &context(), &mut trace).unwrap_err();
        assert!(matches!(err, PipelineError::ChainExhausted { attempts: 1 }));
    }

    #[test]
    fn empty_chain_is_an_error() {
        let chain = SummarizerChain::new(Vec::new(), None);
        let mut trace = DebugTrace::new();
        assert!(matches!(
            chain.summarize("prompt", &context(), &mut trace),
            Err(PipelineError::EmptyChain)
        ));
    }

    #[test]
    fn standard_chain_has_four_stages_in_order() {
        let chain = SummarizerChain::from_config(&ProviderConfig::disabled(), 5);
        assert_eq!(chain.stage_count(), 4);
        let names: Vec<&str> = chain.providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["openai_chat", "gemini_api", "openai_api"]);
    }

    #[test]
    fn disabled_providers_reach_rule_based_stage() {
        let chain = SummarizerChain::from_config(&ProviderConfig::disabled(), 5);
        let mut trace = DebugTrace::new();
        let summary = chain.summarize("prompt", &context(), &mut trace).unwrap();

        assert_eq!(summary.provider, RULE_BASED_PROVIDER);
        assert_eq!(trace.errors.len(), 3);
        assert!(trace.errors[1].starts_with("gemini_api_error"));
    }

    #[test]
    fn rule_based_only_chain() {
        let chain = SummarizerChain::rule_based_only();
        assert_eq!(chain.stage_count(), 1);
        let mut trace = DebugTrace::new();
        let summary = chain.summarize("p", &context(), &mut trace).unwrap();
        assert!(summary.answer.contains("Reasoning:"));
        assert!(trace.steps.is_empty());
    }
}
