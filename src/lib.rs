pub mod config;
pub mod labels;
pub mod pipeline;
pub mod report;

use tracing_subscriber::EnvFilter;

pub use pipeline::{run_pipeline, DebugTrace, PipelineDeps, PipelineResult};
pub use report::{check_interactions, InteractionReport, Severity};

/// Install the global log subscriber. Output goes to stderr so stdout stays
/// free for the JSON report.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("{} v{} logging initialised", config::APP_NAME, config::APP_VERSION);
}
