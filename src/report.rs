//! Downstream report: severity classification, alternative extraction and the
//! JSON document printed by the command-line wrapper.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::labels::{FetchOutcome, LabelFetcher};
use crate::pipeline::{run_pipeline, DebugTrace, PipelineDeps};

pub const REPORT_SOURCE: &str = "openFDA + RAG + LLM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    None,
    Mild,
    Moderate,
    Severe,
    Critical,
    Unknown,
}

impl Severity {
    pub fn indicates_interaction(self) -> bool {
        !matches!(self, Severity::None | Severity::Mild)
    }
}

/// Keyword scan of the narrative answer, most severe term first.
///
/// Text with no recognised term is MODERATE; a missing answer is UNKNOWN.
pub fn classify_severity(answer: Option<&str>) -> Severity {
    let Some(answer) = answer else {
        return Severity::Unknown;
    };
    let text = answer.to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| text.contains(t));

    if has(&["critical", "contraindicated"]) {
        Severity::Critical
    } else if has(&["severe", "major"]) {
        Severity::Severe
    } else if has(&["moderate"]) {
        Severity::Moderate
    } else if has(&["mild", "minor"]) {
        Severity::Mild
    } else if has(&["no interaction", "no significant"]) {
        Severity::None
    } else {
        Severity::Moderate
    }
}

/// Best-effort guess at suggested alternative drugs: capitalised words longer
/// than three characters on lines that mention an alternative. Expect false
/// positives.
pub fn extract_alternatives(answer: &str) -> Vec<String> {
    let lower = answer.to_lowercase();
    if !lower.contains("alternative") && !lower.contains("instead") {
        return Vec::new();
    }

    answer
        .lines()
        .filter(|line| {
            let line = line.to_lowercase();
            line.contains("alternative") || line.contains("consider")
        })
        .flat_map(str::split_whitespace)
        .filter(|word| word.chars().next().is_some_and(char::is_uppercase) && word.chars().count() > 3)
        .map(|word| word.trim_matches(|c| matches!(c, '.' | ',' | ';' | ':')).to_string())
        .take(3)
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionReport {
    pub success: bool,
    pub interaction_detected: bool,
    pub severity: Severity,
    pub description: String,
    pub summary: String,
    pub safer_alternatives: Vec<String>,
    pub labels: BTreeMap<String, FetchOutcome>,
    pub source: String,
    pub debug: DebugTrace,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fetch labels, run the pipeline and classify its answer.
pub fn check_interactions(
    drugs: &[String],
    fetcher: &LabelFetcher,
    deps: &PipelineDeps<'_>,
    config: &PipelineConfig,
) -> InteractionReport {
    let collected = fetcher.collect_texts(drugs);
    if collected.placeholders {
        tracing::warn!(drugs = ?drugs, "No labels found, using placeholder texts");
    }

    let result = run_pipeline(&collected.texts, drugs, config, deps);
    let answer = result.answer.as_deref();

    let severity = classify_severity(answer);
    let error = (!result.success).then(|| {
        result
            .debug
            .errors
            .last()
            .cloned()
            .unwrap_or_else(|| "analysis unavailable".to_string())
    });

    InteractionReport {
        success: result.success,
        interaction_detected: result.success && severity.indicates_interaction(),
        severity,
        description: answer.unwrap_or("No analysis available").to_string(),
        summary: answer.unwrap_or_default().to_string(),
        safer_alternatives: answer.map(extract_alternatives).unwrap_or_default(),
        labels: collected.outcomes,
        source: REPORT_SOURCE.to_string(),
        debug: result.debug,
        error,
    }
}
