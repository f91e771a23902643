//! Layered configuration for the `model-audit` binary
//!
//! Sources, lowest precedence first: `config/default.toml`,
//! `config/{environment}.toml`, `MODEL_AUDIT_*` variables. Flags parsed by
//! `main` are applied on top.

use config::{Config, ConfigError, Environment, File};
use model_audit_fetch::{
    GitHubConfig, GitLabConfig, HttpConfig, HubConfig, LlmConfig, RateLimitConfig, RetryPolicy,
};
use model_audit_service::EngineSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete configuration of the `model-audit` binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub hub: HubConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub gitlab: GitLabConfig,

    /// LLM classifier endpoint; heuristics only when no base URL is set
    #[serde(default)]
    pub llm: LlmConfig,

    /// Transport settings shared by every client
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub retry: RetryPolicy,

    /// Evaluator timeouts, admission threshold, weights, size and ramp-up settings
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub batch: BatchConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Level or `EnvFilter` directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting
    #[serde(default)]
    pub json_format: bool,

    /// Include thread IDs
    #[serde(default)]
    pub include_thread_ids: bool,

    /// Include target module
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// Append logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            include_thread_ids: false,
            include_target: true,
            file: None,
        }
    }
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Models evaluated at the same time; output order is unaffected
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    4
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

impl AuditConfig {
    /// Merge every source under `config_dir` for `environment`
    ///
    /// Missing files are skipped. A file or variable that does not parse
    /// into the expected shape is an error.
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", environment))).required(false))
            // e.g., MODEL_AUDIT_ENGINE__ADMISSION_THRESHOLD=0.6
            .add_source(environment_source())
            .build()?;

        config.try_deserialize()
    }

    /// Like [`AuditConfig::load`], falling back to built-in defaults
    ///
    /// Logging is not installed yet when this runs, so problems go to stderr.
    pub fn load_or_default(config_dir: impl Into<PathBuf>, environment: &str) -> Self {
        Self::load(config_dir, environment).unwrap_or_else(|e| {
            eprintln!("model-audit: ignoring unreadable configuration ({})", e);
            Self::default()
        })
    }
}

/// `MODEL_AUDIT_<SECTION>__<KEY>` variables
fn environment_source() -> Environment {
    Environment::with_prefix("MODEL_AUDIT")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Environment name from `ENVIRONMENT`, then `ENV`, else "development"
pub fn get_environment() -> String {
    std::env::var("ENVIRONMENT")
        .or_else(|_| std::env::var("ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_audit_core::MetricName;
    use secrecy::ExposeSecret;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AuditConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.batch.concurrency, 4);
        assert!(config.llm.base_url.is_none());
        assert!(config.engine.weights.is_none());
    }

    #[test]
    fn test_missing_directory_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuditConfig::load(dir.path().join("absent"), "test").unwrap();
        assert_eq!(config.batch.concurrency, 4);
        assert_eq!(config.retry.max_attempts, RetryPolicy::default().max_attempts);
    }

    #[test]
    fn test_environment_file_overrides_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut default = std::fs::File::create(dir.path().join("default.toml")).unwrap();
        writeln!(
            default,
            r#"
[engine]
admission_threshold = 0.6

[github]
token = "ghp_example"

[batch]
concurrency = 2
"#
        )
        .unwrap();
        let mut staging = std::fs::File::create(dir.path().join("staging.toml")).unwrap();
        writeln!(
            staging,
            r#"
[batch]
concurrency = 8

[engine.weights]
license = 1.0
"#
        )
        .unwrap();

        let config = AuditConfig::load(dir.path(), "staging").unwrap();
        assert_eq!(config.batch.concurrency, 8);
        assert!((config.engine.admission_threshold - 0.6).abs() < 1e-9);
        assert_eq!(
            config.github.token.as_ref().map(|t| t.expose_secret().clone()),
            Some("ghp_example".to_string())
        );
        let weights = config.engine.weights.unwrap();
        assert_eq!(weights.get(&MetricName::License), Some(&1.0));
    }

    #[test]
    fn test_environment_variables_use_single_underscore_after_prefix() {
        let vars = config::Map::from([
            ("MODEL_AUDIT_ENGINE__ADMISSION_THRESHOLD".to_string(), "0.6".to_string()),
            ("MODEL_AUDIT_HTTP__USER_AGENT".to_string(), "audit-bot".to_string()),
        ]);
        let config: AuditConfig = Config::builder()
            .add_source(environment_source().source(Some(vars)))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!((config.engine.admission_threshold - 0.6).abs() < 1e-9);
        assert_eq!(config.http.user_agent, "audit-bot");
    }

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert!(config.include_target);
        assert!(config.file.is_none());
    }
}
