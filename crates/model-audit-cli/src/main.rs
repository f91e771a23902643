//! Model Audit CLI
//!
//! Evaluates every model listed in a URL file (or passed with `--url`) and
//! prints one NDJSON record per model on stdout, in input order.

mod config;
mod input;
mod telemetry;

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::stream::{self, StreamExt};
use model_audit_fetch::{
    build_classifier, GitHubClient, GitHubInsights, GitLabClient, HttpMetadataFetcher, HubClient,
    RateLimiter,
};
use model_audit_service::{EvaluationEngine, EvaluationService};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};

use config::AuditConfig;
use input::{parse_lines, InputLine};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "model-audit", author, version, about, long_about = None)]
struct Args {
    /// File with one model URL or code,dataset,model triple per line
    #[arg(required_unless_present = "url")]
    url_file: Option<PathBuf>,

    /// Evaluate a single model URL instead of a file (repeatable)
    #[arg(long, conflicts_with = "url_file")]
    url: Vec<String>,

    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: PathBuf,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT")]
    environment: Option<String>,

    /// GitHub personal access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Hugging Face access token
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    hf_token: Option<String>,

    /// Base URL of an OpenAI-compatible LLM endpoint
    #[arg(long, env = "LLM_BASE_URL")]
    llm_url: Option<String>,

    /// API key for the LLM endpoint
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Log level
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Models evaluated at the same time
    #[arg(long)]
    concurrency: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = Args::parse();
    let environment = args.environment.clone().unwrap_or_else(config::get_environment);
    let config = apply_overrides(AuditConfig::load_or_default(&args.config_dir, &environment), &args);

    telemetry::try_init(
        telemetry::TelemetryConfig::new()
            .with_log_level(config.logging.level.clone())
            .with_json_format(config.logging.json_format)
            .with_thread_ids(config.logging.include_thread_ids)
            .with_target(config.logging.include_target)
            .with_file(config.logging.file.clone()),
    )
    .context("Failed to initialize logging")?;

    let lines = match &args.url_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            parse_lines(&text)
        }
        None => parse_lines(&args.url.join("\n")),
    };
    if lines.is_empty() {
        bail!("No model URLs to evaluate");
    }

    info!(
        environment = %environment,
        models = lines.len(),
        llm = config.llm.base_url.is_some(),
        "Starting model audit"
    );

    let engine = Arc::new(build_engine(&config)?);
    let concurrency = config.batch.concurrency.max(1);

    let mut records = stream::iter(lines)
        .map(|line| {
            let engine = Arc::clone(&engine);
            async move { evaluate_line(&engine, line).await }
        })
        .buffered(concurrency);

    let mut failures = 0usize;
    let stdout = std::io::stdout();
    while let Some((ok, record)) = records.next().await {
        if !ok {
            failures += 1;
        }
        let mut out = stdout.lock();
        writeln!(out, "{}", record).context("Failed to write output")?;
        out.flush().context("Failed to write output")?;
    }

    if failures > 0 {
        warn!(failures, "Some models could not be evaluated");
        Ok(ExitCode::FAILURE)
    } else {
        info!("Model audit complete");
        Ok(ExitCode::SUCCESS)
    }
}

/// Command-line values win over every configuration source
fn apply_overrides(mut config: AuditConfig, args: &Args) -> AuditConfig {
    if let Some(token) = &args.github_token {
        config.github.token = Some(SecretString::new(token.clone()));
    }
    if let Some(token) = &args.hf_token {
        config.hub.token = Some(SecretString::new(token.clone()));
    }
    if let Some(url) = &args.llm_url {
        config.llm.base_url = Some(url.clone());
    }
    if let Some(key) = &args.llm_api_key {
        config.llm.api_key = Some(SecretString::new(key.clone()));
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
    if let Some(concurrency) = args.concurrency {
        config.batch.concurrency = concurrency;
    }
    config
}

/// Wire the clients, fetcher and collaborators into an engine
fn build_engine(config: &AuditConfig) -> Result<EvaluationEngine> {
    let limiter = RateLimiter::new(config.rate_limit.clone());
    let retry = config.retry.clone();

    let hub = HubClient::new(&config.hub, &config.http, limiter.clone(), retry.clone())
        .context("Failed to create Hugging Face client")?;
    let github = GitHubClient::new(&config.github, &config.http, limiter.clone(), retry.clone())
        .context("Failed to create GitHub client")?;
    let gitlab = GitLabClient::new(&config.gitlab, &config.http, limiter.clone(), retry.clone())
        .context("Failed to create GitLab client")?;
    let classifier = build_classifier(&config.llm, &config.http, limiter, retry)
        .context("Failed to create LLM classifier")?;

    let insights = Arc::new(GitHubInsights::new(github.clone()));
    let fetcher = Arc::new(HttpMetadataFetcher::new(hub, github, gitlab));

    EvaluationEngine::builder(fetcher)
        .classifier(classifier)
        .insights(insights)
        .settings(config.engine.clone())
        .build()
        .context("Invalid engine configuration")
}

/// Evaluate one input line; the flag is false when no score card was produced
async fn evaluate_line(engine: &EvaluationEngine, line: InputLine) -> (bool, Value) {
    let request = match line.request {
        Ok(request) => request,
        Err(e) => {
            warn!(url = %line.url, error = %e, "Skipping malformed input line");
            return (
                false,
                json!({
                    "url": line.url,
                    "error": { "code": "INVALID_INPUT", "message": e.to_string() },
                }),
            );
        }
    };

    match engine.evaluate_request(&request).await {
        Ok(card) => {
            let admission = engine.is_admissible(&card);
            (
                true,
                json!({ "url": line.url, "scorecard": card, "admission": admission }),
            )
        }
        Err(e) => (
            false,
            json!({
                "url": line.url,
                "error": { "code": e.code(), "message": e.to_string() },
            }),
        ),
    }
}
