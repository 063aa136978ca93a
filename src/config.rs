use std::path::PathBuf;

use serde::Serialize;

/// Application-level constants
pub const APP_NAME: &str = "InteractionChecker";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default public endpoints.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const OPENFDA_BASE_URL: &str = "https://api.fda.gov";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,interaction_checker=debug,reqwest=warn"
}

/// Application data directory (`~/.interaction-checker/`).
///
/// Falls back to the working directory when no home directory can be found.
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".interaction-checker")
}

/// Label cache directory. `DRUG_LABEL_CACHE_DIR` overrides the default.
pub fn default_cache_dir() -> PathBuf {
    std::env::var("DRUG_LABEL_CACHE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| app_data_dir().join("cache"))
}

/// Static sample label dataset. `SAMPLE_LABELS_PATH` overrides the default.
pub fn default_sample_labels_path() -> PathBuf {
    std::env::var("SAMPLE_LABELS_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| app_data_dir().join("data").join("sample_labels.json"))
}

/// How label texts are cut into passages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ChunkingMode {
    /// Recursive separator-aware splitting with overlap between windows.
    Overlapping { window: usize, overlap: usize },
    /// Non-overlapping fixed windows. Concatenation reproduces the input.
    Fixed { window: usize },
}

impl Default for ChunkingMode {
    fn default() -> Self {
        ChunkingMode::Overlapping {
            window: 500,
            overlap: 80,
        }
    }
}

/// LLM and embedding provider settings, resolved once by the caller.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub openai_base_url: String,
    pub gemini_base_url: String,
    /// Model for the primary stage and first tier of the tertiary stage.
    pub primary_model: String,
    /// Cheaper model tried when `primary_model` fails in the tertiary stage.
    pub fallback_model: String,
    pub gemini_model: String,
    pub embedding_model: String,
    pub max_tokens: u32,
    /// Master switch for every OpenAI-backed stage (chat and embeddings).
    pub use_openai: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            google_api_key: None,
            openai_base_url: OPENAI_BASE_URL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            primary_model: "gpt-4o-mini".to_string(),
            fallback_model: "gpt-3.5-turbo".to_string(),
            gemini_model: "gemini-flash-latest".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            max_tokens: 650,
            use_openai: true,
        }
    }
}

impl ProviderConfig {
    /// Resolve provider settings from the process environment.
    ///
    /// Empty variables are treated as unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openai_api_key: non_empty_var("OPENAI_API_KEY"),
            google_api_key: non_empty_var("GOOGLE_API_KEY"),
            primary_model: non_empty_var("OPENAI_MODEL").unwrap_or(defaults.primary_model),
            gemini_model: non_empty_var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            use_openai: non_empty_var("USE_OPENAI")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
            ..defaults
        }
    }

    /// Every provider switched off: only the rule-based summary is reachable.
    pub fn disabled() -> Self {
        Self {
            use_openai: false,
            ..Self::default()
        }
    }

    /// OpenAI key, if OpenAI use is switched on.
    pub fn openai_key(&self) -> Option<&str> {
        if !self.use_openai {
            return None;
        }
        self.openai_api_key.as_deref()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Tunables for one pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub top_k: usize,
    pub chunking: ChunkingMode,
    /// Upper bound on context snippets placed in the prompt.
    pub max_context_snippets: usize,
    /// Reports requested per adverse-event query.
    pub adverse_event_limit: usize,
    pub http_timeout_secs: u64,
    pub adverse_event_timeout_secs: u64,
    pub providers: ProviderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            chunking: ChunkingMode::default(),
            max_context_snippets: 8,
            adverse_event_limit: 5,
            http_timeout_secs: 10,
            adverse_event_timeout_secs: 5,
            providers: ProviderConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            providers: ProviderConfig::from_env(),
            ..Self::default()
        }
    }

    /// Deterministic configuration: providers off, default tunables.
    pub fn offline() -> Self {
        Self {
            providers: ProviderConfig::disabled(),
            ..Self::default()
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}
