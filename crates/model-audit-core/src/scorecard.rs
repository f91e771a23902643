//! Aggregated evaluation output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metric::{Availability, MetricName, MetricResult};
use crate::weights::WeightTable;

/// All metric results for one evaluation plus the weighted net score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// One entry per metric, in canonical order
    pub metrics: BTreeMap<MetricName, MetricResult>,

    /// Weighted composite in [0, 1]
    pub net_score: f64,

    /// Wall-clock time from fetch start to the last evaluator completion
    pub net_score_latency_ms: u64,

    /// When the card was finalized
    pub computed_at: DateTime<Utc>,
}

impl ScoreCard {
    /// Finalize a card: fill in any missing metric as unavailable and compute
    /// the net score from the weight table
    pub fn from_results(
        results: impl IntoIterator<Item = MetricResult>,
        weights: &WeightTable,
        net_score_latency_ms: u64,
        computed_at: DateTime<Utc>,
    ) -> Self {
        let mut metrics: BTreeMap<MetricName, MetricResult> = results
            .into_iter()
            .map(|r| (r.name, r))
            .collect();

        for name in MetricName::ALL {
            metrics
                .entry(name)
                .or_insert_with(|| MetricResult::unavailable(name, 0));
        }

        let net_score = metrics
            .iter()
            .map(|(name, result)| weights.weight(*name) * result.score)
            .sum::<f64>()
            .clamp(0.0, 1.0);

        Self {
            metrics,
            net_score,
            net_score_latency_ms,
            computed_at,
        }
    }

    /// Score for a metric (0 when absent)
    pub fn score(&self, metric: MetricName) -> f64 {
        self.metrics.get(&metric).map(|r| r.score).unwrap_or(0.0)
    }

    /// Availability for a metric
    pub fn availability(&self, metric: MetricName) -> Availability {
        self.metrics
            .get(&metric)
            .map(|r| r.availability)
            .unwrap_or(Availability::Unavailable)
    }

    /// Get a metric result
    pub fn get(&self, metric: MetricName) -> Option<&MetricResult> {
        self.metrics.get(&metric)
    }
}
