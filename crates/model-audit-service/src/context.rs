//! Per-evaluation context shared by all evaluators

use chrono::{DateTime, Utc};
use model_audit_fetch::{Classification, Classifier, ClassifyError, RepositoryInsights, Taxonomy};
use std::sync::Arc;
use tracing::warn;

use crate::settings::EngineSettings;

/// Source of "now" for age-based metrics
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Collaborators and settings handed to every evaluator
///
/// Built once per evaluation; `now` is sampled at the start so every metric
/// ages data against the same instant.
#[derive(Clone)]
pub struct EvaluationContext {
    pub classifier: Arc<dyn Classifier>,
    pub insights: Arc<dyn RepositoryInsights>,
    pub settings: Arc<EngineSettings>,
    pub now: DateTime<Utc>,
}

impl EvaluationContext {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        insights: Arc<dyn RepositoryInsights>,
        settings: Arc<EngineSettings>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            classifier,
            insights,
            settings,
            now,
        }
    }

    /// Classify under the configured time budget; a timeout is reported as a
    /// classifier failure so callers take their heuristic path
    pub async fn classify(
        &self,
        text: &str,
        taxonomy: &Taxonomy,
    ) -> Result<Classification, ClassifyError> {
        let budget = self.settings.classify_timeout();
        match tokio::time::timeout(budget, self.classifier.classify(text, taxonomy)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    taxonomy = %taxonomy.name,
                    timeout_ms = budget.as_millis() as u64,
                    "Classifier timed out"
                );
                Err(ClassifyError::Timeout(budget.as_millis() as u64))
            }
        }
    }

    /// Days between `then` and now; future timestamps count as 0
    pub fn age_days(&self, then: DateTime<Utc>) -> f64 {
        let seconds = (self.now - then).num_seconds().max(0) as f64;
        seconds / 86_400.0
    }
}
