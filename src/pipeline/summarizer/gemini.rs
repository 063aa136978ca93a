use serde::{Deserialize, Serialize};

use super::{ProviderError, SummaryProvider};
use crate::config::ProviderConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Google Gemini `generateContent` stage.
pub struct GeminiProvider {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Result<reqwest::blocking::Client, ProviderError>,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = crate::pipeline::http_client(timeout_secs)
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client: {e}")));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.trim_start_matches("models/").to_string(),
            api_key,
            client,
            timeout_secs,
        }
    }

    pub fn from_config(providers: &ProviderConfig, timeout_secs: u64) -> Self {
        Self::new(
            &providers.gemini_base_url,
            &providers.gemini_model,
            providers.google_api_key.clone(),
            timeout_secs,
        )
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl SummaryProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini_api"
    }

    fn ensure_available(&self) -> Result<(), ProviderError> {
        if self.api_key.is_none() {
            return Err(ProviderError::MissingCredential("GOOGLE_API_KEY"));
        }
        self.client.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let client = self.client.as_ref().map_err(Clone::clone)?;
        let key = self
            .api_key
            .as_deref()
            .ok_or(ProviderError::MissingCredential("GOOGLE_API_KEY"))?;

        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = client
            .post(self.endpoint())
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .map_err(|e| ProviderError::from_reqwest(e, &self.base_url, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;
        parse_generate_response(&body)
    }
}

/// First text part of the first candidate.
fn parse_generate_response(body: &str) -> Result<String, ProviderError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

    parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
        .filter(|t| !t.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)
}
