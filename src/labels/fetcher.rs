use std::collections::BTreeMap;

use serde::Serialize;

use super::cache::LabelCache;
use super::openfda::{LabelApi, OpenFdaLabelClient};
use super::sample::SampleLabels;
use super::{normalize_drug_name, LabelDocument, LabelError, LabelSource};
use crate::config::PipelineConfig;

/// Result of one label lookup, with its own step and error log.
#[derive(Debug, Clone, Serialize)]
pub struct FetchOutcome {
    pub success: bool,
    /// Normalized drug name.
    pub drug: String,
    pub text: Option<String>,
    pub source: Option<LabelSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub steps: Vec<String>,
    pub errors: Vec<String>,
}

impl FetchOutcome {
    fn found(
        drug: String,
        text: String,
        source: LabelSource,
        steps: Vec<String>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            drug,
            text: Some(text),
            source: Some(source),
            error: None,
            steps,
            errors,
        }
    }

    /// The label this lookup produced, filed under the name as requested.
    fn document(&self, requested: &str) -> Option<LabelDocument> {
        match (&self.text, self.source) {
            (Some(text), Some(source)) if self.success => Some(LabelDocument {
                drug: requested.to_string(),
                text: text.clone(),
                source,
            }),
            _ => None,
        }
    }
}

/// Pipeline input texts and the per-drug lookups behind them.
#[derive(Debug, Clone, Default)]
pub struct CollectedLabels {
    /// One per drug that has text, in request order.
    pub documents: Vec<LabelDocument>,
    /// `"<drug>:\n<text>"` for each document.
    pub texts: Vec<String>,
    /// Keyed by the drug name as requested.
    pub outcomes: BTreeMap<String, FetchOutcome>,
    /// True when no lookup succeeded and placeholder texts were used.
    pub placeholders: bool,
}

/// Resolves drug names to label text: cache, then remote API, then the
/// sample dataset.
pub struct LabelFetcher {
    cache: Option<LabelCache>,
    api: Option<Box<dyn LabelApi>>,
    samples: SampleLabels,
}

impl LabelFetcher {
    pub fn new(
        cache: Option<LabelCache>,
        api: Option<Box<dyn LabelApi>>,
        samples: SampleLabels,
    ) -> Self {
        Self {
            cache,
            api,
            samples,
        }
    }

    /// Production fetcher. `offline` leaves out the remote API; the cache and
    /// sample dataset are still consulted.
    pub fn from_config(
        config: &PipelineConfig,
        cache: LabelCache,
        samples: SampleLabels,
        offline: bool,
    ) -> Result<Self, LabelError> {
        let api: Option<Box<dyn LabelApi>> = if offline {
            None
        } else {
            Some(Box::new(OpenFdaLabelClient::public(config.http_timeout_secs)?))
        };
        Ok(Self::new(Some(cache), api, samples))
    }

    pub fn fetch(&self, drug: &str) -> FetchOutcome {
        let key = normalize_drug_name(drug);
        let mut steps = Vec::new();
        let mut errors = Vec::new();

        if let Some(cache) = &self.cache {
            if let Some(entry) = cache.get(&key) {
                steps.push("loaded_from_cache".to_string());
                tracing::debug!(drug = %key, "Label loaded from cache");
                return FetchOutcome::found(key, entry.text, LabelSource::Cache, steps, errors);
            }
        }

        if let Some(api) = &self.api {
            steps.push("remote_label_request".to_string());
            match api.fetch_label(drug.trim()) {
                Ok(label) => {
                    if let Some(cache) = &self.cache {
                        if let Err(e) = cache.put(&key, &label.text, Some(label.raw)) {
                            tracing::warn!(drug = %key, error = %e, "Failed to cache label");
                        }
                    }
                    steps.push("fetched_from_remote".to_string());
                    return FetchOutcome::found(key, label.text, LabelSource::Remote, steps, errors);
                }
                Err(e) => {
                    tracing::warn!(drug = %key, error = %e, "Remote label lookup failed");
                    errors.push(format!("remote_error: {e}"));
                }
            }
        }

        match self.samples.text_for(&key) {
            Some(text) => {
                steps.push("loaded_from_sample".to_string());
                tracing::info!(drug = %key, "Using sample label");
                FetchOutcome::found(key, text, LabelSource::Sample, steps, errors)
            }
            None => {
                errors.push("no_sample_entry".to_string());
                let message = format!(
                    "No label found for '{}'. Steps: {:?}. Errors: {:?}",
                    drug.trim(),
                    steps,
                    errors
                );
                tracing::warn!(drug = %key, "{message}");
                FetchOutcome {
                    success: false,
                    drug: key,
                    text: None,
                    source: None,
                    error: Some(message),
                    steps,
                    errors,
                }
            }
        }
    }

    /// Fetch every drug and build the pipeline input texts.
    ///
    /// When no lookup succeeds, each drug gets its sample text or a
    /// `"No data for <drug>"` placeholder so the pipeline still has input.
    pub fn collect_texts(&self, drugs: &[String]) -> CollectedLabels {
        let mut collected = CollectedLabels::default();

        for drug in drugs {
            let outcome = self.fetch(drug);
            collected.documents.extend(outcome.document(drug));
            collected.outcomes.insert(drug.clone(), outcome);
        }

        if collected.documents.is_empty() {
            collected.placeholders = true;
            collected.documents = drugs.iter().map(|drug| self.placeholder(drug)).collect();
        }

        collected.texts = collected
            .documents
            .iter()
            .map(LabelDocument::pipeline_input)
            .collect();
        collected
    }

    fn placeholder(&self, drug: &str) -> LabelDocument {
        let (text, source) = match self.samples.text_for(drug) {
            Some(text) => (text, LabelSource::Sample),
            None => (format!("No data for {drug}"), LabelSource::Placeholder),
        };
        LabelDocument {
            drug: drug.to_string(),
            text,
            source,
        }
    }
}
