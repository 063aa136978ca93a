//! Drug label fetch layer: cache, openFDA label API, static sample dataset.

pub mod cache;
pub mod openfda;
pub mod sample;
pub mod fetcher;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::LabelCache;
pub use fetcher::{CollectedLabels, FetchOutcome, LabelFetcher};
pub use openfda::{LabelApi, OpenFdaLabelClient};
pub use sample::SampleLabels;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Label API returned {status}")]
    Status { status: u16 },

    #[error("No label found for {0}")]
    NotFound(String),

    #[error("Label for {0} has no usable sections")]
    EmptyLabel(String),
}

/// Which source satisfied a label request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelSource {
    Cache,
    Remote,
    Sample,
    /// Synthetic "no data" text used when every lookup failed.
    Placeholder,
}

impl std::fmt::Display for LabelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LabelSource::Cache => "cache",
            LabelSource::Remote => "remote",
            LabelSource::Sample => "sample",
            LabelSource::Placeholder => "placeholder",
        };
        f.write_str(s)
    }
}

/// Label text for one drug and where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDocument {
    pub drug: String,
    pub text: String,
    pub source: LabelSource,
}

impl LabelDocument {
    /// Pipeline input form: `"<drug>:\n<text>"`.
    pub fn pipeline_input(&self) -> String {
        format!("{}:\n{}", self.drug, self.text)
    }
}

/// Cache and dataset key: trimmed, lowercased, spaces replaced by `_`.
pub fn normalize_drug_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Render label sections as `"<NAME_UPPER>:\n<lines>"` blocks joined by a
/// blank line. Sections with no non-blank lines are dropped.
pub(crate) fn render_sections<'a, I>(sections: I) -> String
where
    I: IntoIterator<Item = (&'a str, Vec<String>)>,
{
    sections
        .into_iter()
        .filter_map(|(name, lines)| {
            let lines: Vec<&str> = lines
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .collect();
            if lines.is_empty() {
                None
            } else {
                Some(format!("{}:\n{}", name.to_uppercase(), lines.join("\n")))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
