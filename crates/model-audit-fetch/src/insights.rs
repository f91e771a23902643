//! Secondary repository lookups used by code-level metrics
//!
//! These calls are made lazily by the evaluators that need them, not by the
//! fetcher, so a slow CI or review API only ever degrades one metric.

use async_trait::async_trait;
use futures::future::try_join_all;
use model_audit_core::{HostKind, ModelReference, ReviewStats};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::{debug, instrument};

use crate::error::{FetchError, FetchResult, PermanentKind};
use crate::github::{CheckRun, GitHubClient};

/// CI-derived health signals for a code repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeSignals {
    /// Fraction of completed lint-style check runs that passed
    pub lint_pass_rate: Option<f64>,
    /// Fraction of completed type-check runs that passed
    pub typecheck_pass_rate: Option<f64>,
}

/// Secondary lookups against a code host
#[async_trait]
pub trait RepositoryInsights: Send + Sync {
    /// Lint and type-check pass rates
    async fn code_signals(&self, repo: &ModelReference) -> FetchResult<CodeSignals>;

    /// Review coverage of recently merged pull requests
    async fn review_stats(&self, repo: &ModelReference) -> FetchResult<ReviewStats>;
}

/// Insights used when no code host is configured; every lookup fails
#[derive(Debug, Clone, Default)]
pub struct UnavailableInsights;

#[async_trait]
impl RepositoryInsights for UnavailableInsights {
    async fn code_signals(&self, repo: &ModelReference) -> FetchResult<CodeSignals> {
        Err(FetchError::Configuration(format!("no insights configured for {}", repo)))
    }

    async fn review_stats(&self, repo: &ModelReference) -> FetchResult<ReviewStats> {
        Err(FetchError::Configuration(format!("no insights configured for {}", repo)))
    }
}

/// Insights backed by the GitHub API
#[derive(Debug, Clone)]
pub struct GitHubInsights {
    github: GitHubClient,
}

impl GitHubInsights {
    pub fn new(github: GitHubClient) -> Self {
        Self { github }
    }

    fn require_github(repo: &ModelReference) -> FetchResult<()> {
        if repo.host() == HostKind::GitHub {
            Ok(())
        } else {
            Err(FetchError::permanent(
                PermanentKind::Client(400),
                repo.to_string(),
                format!("no insights available for {} repositories", repo.host()),
            ))
        }
    }
}

#[async_trait]
impl RepositoryInsights for GitHubInsights {
    #[instrument(skip(self), fields(repo = %repo.id()))]
    async fn code_signals(&self, repo: &ModelReference) -> FetchResult<CodeSignals> {
        Self::require_github(repo)?;
        let info = self.github.repo(repo.id()).await?;
        let branch = info.default_branch.as_deref().unwrap_or("HEAD");
        let runs = self.github.check_runs(repo.id(), branch).await?;
        let signals = signals_from_check_runs(&runs);
        debug!(runs = runs.len(), ?signals, "Collected check runs");
        Ok(signals)
    }

    #[instrument(skip(self), fields(repo = %repo.id()))]
    async fn review_stats(&self, repo: &ModelReference) -> FetchResult<ReviewStats> {
        Self::require_github(repo)?;
        let pulls = self.github.merged_pulls(repo.id()).await?;

        let per_pull = try_join_all(pulls.iter().map(|pull| async move {
            let reviews = self.github.reviews(repo.id(), pull.number).await?;
            let additions = self.github.pull_additions(repo.id(), pull.number).await?;
            let reviewed = reviews
                .iter()
                .any(|r| r.state == "APPROVED" || r.state == "CHANGES_REQUESTED");
            Ok::<_, FetchError>((reviewed, additions))
        }))
        .await?;

        let mut stats = ReviewStats {
            merged: per_pull.len() as u64,
            ..Default::default()
        };
        for (reviewed, additions) in per_pull {
            stats.total_additions += additions;
            if reviewed {
                stats.reviewed += 1;
                stats.reviewed_additions += additions;
            }
        }
        Ok(stats)
    }
}

struct CheckPatterns {
    lint: Regex,
    typecheck: Regex,
}

fn check_patterns() -> Option<&'static CheckPatterns> {
    static PATTERNS: OnceLock<Option<CheckPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(CheckPatterns {
                lint: Regex::new(r"(?i)lint|clippy|flake8|eslint|ruff|rustfmt|\bfmt\b|black|pre-commit|style").ok()?,
                typecheck: Regex::new(r"(?i)mypy|type.?check|\btsc\b|pyright|pytype|typing").ok()?,
            })
        })
        .as_ref()
}

/// Pass rates of lint and type-check runs; runs still in progress or skipped
/// are not counted
pub fn signals_from_check_runs(runs: &[CheckRun]) -> CodeSignals {
    let Some(patterns) = check_patterns() else {
        return CodeSignals::default();
    };

    let rate = |re: &Regex| {
        let completed: Vec<&str> = runs
            .iter()
            .filter(|r| re.is_match(&r.name))
            .filter_map(|r| r.conclusion.as_deref())
            .filter(|c| !matches!(*c, "skipped" | "cancelled" | "stale"))
            .collect();
        if completed.is_empty() {
            None
        } else {
            let passed = completed
                .iter()
                .filter(|c| matches!(**c, "success" | "neutral"))
                .count();
            Some(passed as f64 / completed.len() as f64)
        }
    };

    CodeSignals {
        lint_pass_rate: rate(&patterns.lint),
        typecheck_pass_rate: rate(&patterns.typecheck),
    }
}
