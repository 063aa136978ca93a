use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProviderConfig;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Embeddings unavailable: {0}")]
    Unavailable(String),

    #[error("Embedding request failed: {0}")]
    HttpClient(String),

    #[error("Embedding service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Embedding response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Embedding count mismatch: sent {sent}, received {received}")]
    CountMismatch { sent: usize, received: usize },
}

/// Text embedding abstraction (allows mocking).
pub trait EmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// OpenAI `/v1/embeddings` client.
pub struct OpenAiEmbedder {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout_secs: u64,
    ) -> Result<Self, EmbeddingError> {
        let client = super::http_client(timeout_secs)
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// Build an embedder from provider settings. `None` when OpenAI is
    /// switched off or no key is configured.
    pub fn from_config(
        providers: &ProviderConfig,
        timeout_secs: u64,
    ) -> Option<Result<Self, EmbeddingError>> {
        let key = providers.openai_key()?;
        Some(Self::new(
            &providers.openai_base_url,
            key,
            &providers.embedding_model,
            timeout_secs,
        ))
    }
}

impl EmbeddingModel for OpenAiEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or(EmbeddingError::CountMismatch { sent: 1, received: 0 })
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/v1/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .map_err(|e| EmbeddingError::HttpClient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .map_err(|e| EmbeddingError::ResponseParsing(e.to_string()))?;
        parse_embedding_response(&body, texts.len())
    }
}

/// Parse an embeddings payload, restoring request order by `index`.
fn parse_embedding_response(body: &str, sent: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let mut parsed: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| EmbeddingError::ResponseParsing(e.to_string()))?;

    if parsed.data.len() != sent {
        return Err(EmbeddingError::CountMismatch {
            sent,
            received: parsed.data.len(),
        });
    }

    parsed.data.sort_by_key(|d| d.index);
    Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
}

/// Mock embedding model for testing: hashed bag-of-words vectors, so texts
/// sharing words land close together.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingModel for MockEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(bag_of_words(text, self.dimension))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| bag_of_words(t, self.dimension)).collect())
    }
}

fn bag_of_words(text: &str, dim: usize) -> Vec<f32> {
    let mut vec = vec![0.0f32; dim];
    for word in text.split_whitespace() {
        let word = word.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
        if word.is_empty() {
            continue;
        }
        // FNV-1a
        let hash = word
            .bytes()
            .fold(0xcbf29ce484222325u64, |h, b| (h ^ b as u64).wrapping_mul(0x100000001b3));
        vec[(hash % dim as u64) as usize] += 1.0;
    }
    vec
}
