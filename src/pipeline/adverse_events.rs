//! Allergy context from the openFDA adverse-event (FAERS) dataset.
//!
//! For every drug and every allergy reaction term one query is issued. Each
//! matching reaction becomes a context line; a drug with no matches at all
//! gets one explicit "no allergic reactions found" line.

use serde::Deserialize;
use thiserror::Error;

use super::debug::DebugTrace;
use crate::config::OPENFDA_BASE_URL;

/// Reaction terms queried per drug, in order.
pub const ALLERGY_TERMS: &[&str] = &[
    "allergic reaction",
    "rash",
    "hives",
    "urticaria",
    "anaphylaxis",
    "angioedema",
];

/// Source label used in context lines.
pub const OPENFDA_SOURCE: &str = "openFDA";

#[derive(Error, Debug)]
pub enum AdverseEventError {
    #[error("Adverse-event client unavailable: {0}")]
    ClientInit(String),

    #[error("Adverse-event request timed out after {0}s")]
    Timeout(u64),

    #[error("Adverse-event request failed: {0}")]
    HttpClient(String),

    #[error("Adverse-event service returned {status}")]
    Status { status: u16 },

    #[error("Adverse-event response parsing error: {0}")]
    ResponseParsing(String),
}

/// One reaction attributed to a drug in a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionReport {
    pub drug: String,
    pub reaction: String,
    pub serious: Option<String>,
}

/// Adverse-event dataset abstraction (allows mocking).
pub trait AdverseEventSource {
    /// Source label used in context lines, e.g. `openFDA`.
    fn source_name(&self) -> &str;

    /// Reports for `drug` whose reaction matches `term`.
    fn query_reactions(
        &self,
        drug: &str,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ReactionReport>, AdverseEventError>;
}

/// openFDA `/drug/event.json` client.
pub struct OpenFdaEventClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct EventResponse {
    #[serde(default)]
    results: Vec<EventResult>,
}

#[derive(Deserialize)]
struct EventResult {
    #[serde(default)]
    serious: Option<serde_json::Value>,
    #[serde(default)]
    patient: Option<EventPatient>,
}

#[derive(Deserialize)]
struct EventPatient {
    #[serde(default)]
    reaction: Vec<EventReaction>,
}

#[derive(Deserialize)]
struct EventReaction {
    #[serde(rename = "reactionmeddrapt", default)]
    meddra_term: Option<String>,
}

impl OpenFdaEventClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, AdverseEventError> {
        let client = super::http_client(timeout_secs)
            .map_err(|e| AdverseEventError::ClientInit(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    /// Public openFDA endpoint with the given timeout.
    pub fn public(timeout_secs: u64) -> Result<Self, AdverseEventError> {
        Self::new(OPENFDA_BASE_URL, timeout_secs)
    }
}

impl AdverseEventSource for OpenFdaEventClient {
    fn source_name(&self) -> &str {
        OPENFDA_SOURCE
    }

    fn query_reactions(
        &self,
        drug: &str,
        term: &str,
        limit: usize,
    ) -> Result<Vec<ReactionReport>, AdverseEventError> {
        let url = format!("{}/drug/event.json", self.base_url);
        let search = format!(
            "patient.drug.medicinalproduct:{drug} AND patient.reaction.reactionmeddrapt:\"{term}\""
        );

        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("search", search.as_str()), ("limit", limit.as_str())])
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    AdverseEventError::Timeout(self.timeout_secs)
                } else {
                    AdverseEventError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        // openFDA answers 404 when nothing matches the search.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(AdverseEventError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| AdverseEventError::ResponseParsing(e.to_string()))?;
        parse_event_response(&body, drug, term)
    }
}

/// Extract the reactions matching `term` (case-insensitive substring).
fn parse_event_response(
    body: &str,
    drug: &str,
    term: &str,
) -> Result<Vec<ReactionReport>, AdverseEventError> {
    let parsed: EventResponse = serde_json::from_str(body)
        .map_err(|e| AdverseEventError::ResponseParsing(e.to_string()))?;
    let term = term.to_lowercase();

    let mut reports = Vec::new();
    for result in parsed.results {
        let serious = result.serious.as_ref().and_then(flag_text);
        let Some(patient) = result.patient else {
            continue;
        };
        for reaction in patient.reaction {
            let Some(name) = reaction.meddra_term else {
                continue;
            };
            if name.to_lowercase().contains(&term) {
                reports.push(ReactionReport {
                    drug: drug.to_string(),
                    reaction: name,
                    serious: serious.clone(),
                });
            }
        }
    }

    Ok(reports)
}

/// openFDA encodes flags as strings ("1") but numbers appear in the wild.
fn flag_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Render one context line for a reaction report.
pub fn reaction_line(source: &str, report: &ReactionReport) -> String {
    match &report.serious {
        Some(flag) => format!(
            "{source} reports: {} caused {}, serious: {flag}",
            report.drug, report.reaction
        ),
        None => format!("{source} reports: {} caused {}", report.drug, report.reaction),
    }
}

/// Render the explicit absence-of-evidence line for a drug.
pub fn no_reactions_line(source: &str, drug: &str) -> String {
    format!("{source} reports: No allergic reactions found for {drug}.")
}

/// Build allergy context lines for every drug, in drug order.
///
/// Per-term failures are recorded and treated as "no results for that term",
/// so every drug yields at least one line.
pub fn allergy_context(
    drugs: &[String],
    source: &dyn AdverseEventSource,
    limit: usize,
    trace: &mut DebugTrace,
) -> Vec<String> {
    let source_name = source.source_name().to_string();
    let mut lines = Vec::new();

    for drug in drugs {
        let mut found = Vec::new();
        for term in ALLERGY_TERMS {
            match source.query_reactions(drug, term, limit) {
                Ok(reports) => found.extend(reports),
                Err(e) => trace.error(format!("adverse_event_error: {drug}/{term}: {e}")),
            }
        }

        if found.is_empty() {
            lines.push(no_reactions_line(&source_name, drug));
        } else {
            tracing::debug!(drug = %drug, count = found.len(), "Allergy reactions found");
            lines.extend(found.iter().map(|r| reaction_line(&source_name, r)));
        }
    }

    lines
}
