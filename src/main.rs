//! `check-interactions`: fetch drug labels, run the interaction pipeline and
//! print a JSON report on stdout.
//!
//! Drugs are given either as one JSON array argument
//! (`check-interactions '["warfarin", "amoxicillin"]'`) or as plain names.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use serde_json::json;

use interaction_checker::config::{self, PipelineConfig, ProviderConfig};
use interaction_checker::labels::{LabelCache, LabelFetcher, SampleLabels};
use interaction_checker::pipeline::orchestrator::LiveServices;
use interaction_checker::report::check_interactions;

#[derive(Parser, Debug)]
#[command(name = "check-interactions")]
#[command(version = config::APP_VERSION)]
#[command(about = "Check a list of drugs for potential interactions", long_about = None)]
struct Cli {
    /// JSON array of drug names, or the names themselves
    #[arg(required = true, num_args = 1..)]
    drugs: Vec<String>,

    /// Passages retrieved per run
    #[arg(long, default_value_t = 5)]
    top_k: usize,

    /// Skip every remote service; use cache, sample labels and the rule-based summary
    #[arg(long)]
    offline: bool,

    /// Label cache directory
    #[arg(long, env = "DRUG_LABEL_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Sample label dataset (JSON)
    #[arg(long, env = "SAMPLE_LABELS_PATH")]
    samples: Option<PathBuf>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    interaction_checker::init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.render().to_string();
            return fail(&format!(
                "Invalid arguments: {}",
                rendered.lines().next().unwrap_or_default()
            ));
        }
    };

    let drugs = match parse_drugs(&cli.drugs) {
        Ok(drugs) => drugs,
        Err(message) => return fail(&message),
    };

    let mut config = PipelineConfig::from_env().with_top_k(cli.top_k);
    if cli.offline {
        config.providers = ProviderConfig::disabled();
    }

    let cache = LabelCache::new(cli.cache_dir.unwrap_or_else(config::default_cache_dir));
    let samples = SampleLabels::load(
        &cli.samples
            .unwrap_or_else(config::default_sample_labels_path),
    );
    let fetcher = match LabelFetcher::from_config(&config, cache, samples, cli.offline) {
        Ok(fetcher) => fetcher,
        Err(e) => return fail(&format!("Unexpected error: {e}")),
    };

    let services = if cli.offline {
        LiveServices::offline(&config)
    } else {
        LiveServices::connect(&config)
    };

    tracing::info!(drugs = ?drugs, offline = cli.offline, "Checking interactions");
    let report = check_interactions(&drugs, &fetcher, &services.deps(), &config);

    match serde_json::to_string(&report) {
        Ok(out) => {
            println!("{out}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&format!("Unexpected error: {e}")),
    }
}

/// Accept one JSON array argument or a list of plain names. At least two
/// non-blank entries are required.
fn parse_drugs(args: &[String]) -> Result<Vec<String>, String> {
    let drugs: Vec<String> = match args {
        [single] if single.trim_start().starts_with('[') => {
            let value: serde_json::Value =
                serde_json::from_str(single).map_err(|e| format!("Invalid JSON input: {e}"))?;
            value
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|v| v.as_str())
                        .map(|s| s.trim().to_string())
                        .collect()
                })
                .unwrap_or_default()
        }
        _ => args.iter().map(|s| s.trim().to_string()).collect(),
    };

    let drugs: Vec<String> = drugs.into_iter().filter(|d| !d.is_empty()).collect();
    if drugs.len() < 2 {
        return Err("Please provide at least 2 drugs as a JSON array".to_string());
    }
    Ok(drugs)
}

fn fail(message: &str) -> ExitCode {
    tracing::error!("{message}");
    println!("{}", json!({ "success": false, "error": message }));
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn json_array_argument() {
        assert_eq!(
            parse_drugs(&args(&[r#"["Warfarin", " Amoxicillin "]"#])).unwrap(),
            vec!["Warfarin", "Amoxicillin"]
        );
    }

    #[test]
    fn plain_names() {
        assert_eq!(
            parse_drugs(&args(&["warfarin", "aspirin"])).unwrap(),
            vec!["warfarin", "aspirin"]
        );
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_drugs(&args(&["[\"warfarin\""])).unwrap_err();
        assert!(err.starts_with("Invalid JSON input"));
    }

    #[test]
    fn fewer_than_two_drugs_is_rejected() {
        assert!(parse_drugs(&args(&[r#"["warfarin"]"#])).is_err());
        assert!(parse_drugs(&args(&["warfarin"])).is_err());
        assert!(parse_drugs(&args(&["warfarin", "  "])).is_err());
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from(["check-interactions", "--offline", "--top-k", "3", "a", "b"])
            .unwrap();
        assert!(cli.offline);
        assert_eq!(cli.top_k, 3);
        assert_eq!(cli.drugs, vec!["a", "b"]);
    }
}
