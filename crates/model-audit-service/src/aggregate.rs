//! Net score aggregation

use chrono::{DateTime, Utc};
use model_audit_core::{AggregationConfigError, MetricResult, ScoreCard, WeightTable};
use std::time::Duration;
use tracing::debug;

use crate::settings::EngineSettings;

/// Combines metric results into a [`ScoreCard`] using a validated weight table
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregator {
    weights: WeightTable,
}

impl Aggregator {
    pub fn new(weights: WeightTable) -> Self {
        Self { weights }
    }

    /// Aggregator over the standard weight table
    pub fn standard() -> Self {
        Self::new(WeightTable::standard())
    }

    /// Use custom weights from settings when present; the table is validated
    /// here so a bad configuration fails before any evaluation runs
    pub fn from_settings(settings: &EngineSettings) -> Result<Self, AggregationConfigError> {
        match &settings.weights {
            Some(custom) => Ok(Self::new(WeightTable::new(custom.clone())?)),
            None => Ok(Self::standard()),
        }
    }

    pub fn weights(&self) -> &WeightTable {
        &self.weights
    }

    /// Finalize a score card; metrics absent from `results` count as 0
    pub fn aggregate(
        &self,
        results: Vec<MetricResult>,
        elapsed: Duration,
        computed_at: DateTime<Utc>,
    ) -> ScoreCard {
        let card = ScoreCard::from_results(
            results,
            &self.weights,
            elapsed.as_millis() as u64,
            computed_at,
        );
        debug!(
            net_score = card.net_score,
            latency_ms = card.net_score_latency_ms,
            "Aggregated score card"
        );
        card
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::standard()
    }
}
