use serde::Deserialize;

use super::{render_sections, LabelError};
use crate::config::OPENFDA_BASE_URL;

/// Label fields used to build label text, in output order.
pub const LABEL_FIELDS: &[&str] = &[
    "warnings",
    "drug_interactions",
    "contraindications",
    "precautions",
];

/// A label fetched from a remote API: rendered text plus the raw record.
#[derive(Debug, Clone)]
pub struct RemoteLabel {
    pub text: String,
    pub raw: serde_json::Value,
}

/// Remote label lookup (allows mocking).
pub trait LabelApi {
    fn fetch_label(&self, drug: &str) -> Result<RemoteLabel, LabelError>;
}

/// openFDA `/drug/label.json` client.
pub struct OpenFdaLabelClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

impl OpenFdaLabelClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, LabelError> {
        let client = crate::pipeline::http_client(timeout_secs)
            .map_err(|e| LabelError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn public(timeout_secs: u64) -> Result<Self, LabelError> {
        Self::new(OPENFDA_BASE_URL, timeout_secs)
    }
}

impl LabelApi for OpenFdaLabelClient {
    fn fetch_label(&self, drug: &str) -> Result<RemoteLabel, LabelError> {
        let url = format!("{}/drug/label.json", self.base_url);
        let search = format!("openfda.generic_name:\"{drug}\"");

        let response = self
            .client
            .get(&url)
            .query(&[("search", search.as_str()), ("limit", "1")])
            .send()
            .map_err(|e| LabelError::HttpClient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LabelError::NotFound(drug.to_string()));
        }
        if !status.is_success() {
            return Err(LabelError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| LabelError::HttpClient(e.to_string()))?;
        parse_label_response(drug, &body)
    }
}

/// Render the first result of a label search.
pub(crate) fn parse_label_response(drug: &str, body: &str) -> Result<RemoteLabel, LabelError> {
    let parsed: LabelResponse = serde_json::from_str(body)?;
    let record = parsed
        .results
        .into_iter()
        .next()
        .ok_or_else(|| LabelError::NotFound(drug.to_string()))?;

    let text = render_sections(
        LABEL_FIELDS
            .iter()
            .map(|field| (*field, field_lines(record.get(*field)))),
    );
    if text.is_empty() {
        return Err(LabelError::EmptyLabel(drug.to_string()));
    }

    Ok(RemoteLabel { text, raw: record })
}

/// Label fields are usually arrays of strings; single strings also occur.
pub(crate) fn field_lines(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(String::from))
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_renders_known_fields_in_order() {
        let body = r#"{"results":[{
            "precautions": ["Monitor INR."],
            "warnings": ["Bleeding risk.", "Avoid NSAIDs."],
            "indications_and_usage": ["ignored"],
            "drug_interactions": "Antibiotics may potentiate."
        }]}"#;
        let label = parse_label_response("warfarin", body).unwrap();
        assert_eq!(
            label.text,
            "WARNINGS:\nBleeding risk.\nAvoid NSAIDs.\n\nDRUG_INTERACTIONS:\nAntibiotics may potentiate.\n\nPRECAUTIONS:\nMonitor INR."
        );
        assert!(label.raw.get("indications_and_usage").is_some());
    }

    #[test]
    fn no_results_is_not_found() {
        assert!(matches!(
            parse_label_response("x", r#"{"results":[]}"#),
            Err(LabelError::NotFound(_))
        ));
        assert!(matches!(
            parse_label_response("x", r#"{"error":{"code":"NOT_FOUND"}}"#),
            Err(LabelError::NotFound(_))
        ));
    }

    #[test]
    fn record_without_sections_is_empty() {
        assert!(matches!(
            parse_label_response("x", r#"{"results":[{"id":"1"}]}"#),
            Err(LabelError::EmptyLabel(_))
        ));
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(
            parse_label_response("x", "not json"),
            Err(LabelError::Json(_))
        ));
    }

    #[test]
    fn client_construction() {
        let client = OpenFdaLabelClient::new("https://api.fda.gov/", 10).unwrap();
        assert_eq!(client.base_url, "https://api.fda.gov");
    }
}
