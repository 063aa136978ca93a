pub mod types;
pub mod debug;
pub mod chunker;
pub mod embedder;
pub mod retrieval;
pub mod adverse_events;
pub mod prompt;
pub mod summarizer;
pub mod orchestrator;

use thiserror::Error;

pub use orchestrator::{run_pipeline, PipelineDeps};
pub use types::{Passage, PipelineResult};
pub use debug::DebugTrace;

/// Failures that escape every fallback and turn into `success = false`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Summarizer chain exhausted after {attempts} stage(s) without an answer")]
    ChainExhausted { attempts: usize },

    #[error("Summarizer chain has no stages")]
    EmptyChain,
}

/// Build a blocking HTTP client with a per-request timeout.
///
/// Shared by every remote collaborator so each call carries its own deadline.
pub(crate) fn http_client(
    timeout_secs: u64,
) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(concat!("interaction-checker/", env!("CARGO_PKG_VERSION")))
        .build()
}
