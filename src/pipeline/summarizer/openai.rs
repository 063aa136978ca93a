use serde::{Deserialize, Serialize};

use super::{ProviderError, SummaryProvider};
use crate::config::ProviderConfig;

/// OpenAI chat-completions HTTP client.
pub struct OpenAiChatClient {
    base_url: String,
    api_key: String,
    max_tokens: u32,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = crate::pipeline::http_client(timeout_secs)
            .map_err(|e| ProviderError::Unavailable(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_tokens,
            client,
            timeout_secs,
        })
    }

    /// Single-turn completion at temperature 0.
    pub fn complete(&self, model: &str, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
        parse_chat_response(&body)
    }
}

fn parse_chat_response(body: &str) -> Result<String, ProviderError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or(ProviderError::EmptyResponse)
}

/// Chain stage backed by OpenAI chat completions.
///
/// `models` are tried in order; the stage fails only when every model fails,
/// reporting the last error.
pub struct OpenAiChatProvider {
    name: String,
    models: Vec<String>,
    client: Result<OpenAiChatClient, ProviderError>,
}

impl OpenAiChatProvider {
    pub fn new(name: &str, client: Result<OpenAiChatClient, ProviderError>, models: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            models,
            client,
        }
    }

    pub fn from_config(
        name: &str,
        providers: &ProviderConfig,
        models: Vec<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = if !providers.use_openai {
            Err(ProviderError::Unavailable("OpenAI use is switched off".into()))
        } else {
            match providers.openai_key() {
                Some(key) => OpenAiChatClient::new(
                    &providers.openai_base_url,
                    key,
                    providers.max_tokens,
                    timeout_secs,
                ),
                None => Err(ProviderError::MissingCredential("OPENAI_API_KEY")),
            }
        };
        Self::new(name, client, models)
    }
}

impl SummaryProvider for OpenAiChatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn ensure_available(&self) -> Result<(), ProviderError> {
        if self.models.is_empty() {
            return Err(ProviderError::Unavailable("no model configured".into()));
        }
        self.client.as_ref().map(|_| ()).map_err(Clone::clone)
    }

    fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let client = self.client.as_ref().map_err(Clone::clone)?;

        let mut last_error = ProviderError::Unavailable("no model configured".into());
        for (tier, model) in self.models.iter().enumerate() {
            match client.complete(model, prompt) {
                Ok(text) => {
                    if tier > 0 {
                        tracing::info!(provider = %self.name, model = %model, "Fallback model answered");
                    }
                    return Ok(text);
                }
                Err(e) => {
                    tracing::warn!(provider = %self.name, model = %model, error = %e, "OpenAI model failed");
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }
}
