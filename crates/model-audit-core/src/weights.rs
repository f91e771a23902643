//! Net score weight table

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::AggregationConfigError;
use crate::metric::MetricName;

const SUM_TOLERANCE: f64 = 1e-9;

/// Per-metric weights for the net score
///
/// Always valid once constructed: every weight is in [0, 1] and the weights
/// sum to 1.0. Metrics absent from the table carry weight 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightTable {
    weights: BTreeMap<MetricName, f64>,
}

impl WeightTable {
    /// The standard table; reviewedness is reported but not weighted
    pub fn standard() -> Self {
        let weights = BTreeMap::from([
            (MetricName::License, 0.20),
            (MetricName::RampUpTime, 0.15),
            (MetricName::BusFactor, 0.15),
            (MetricName::DatasetAndCode, 0.10),
            (MetricName::DatasetQuality, 0.10),
            (MetricName::CodeQuality, 0.10),
            (MetricName::PerformanceClaims, 0.10),
            (MetricName::Size, 0.10),
        ]);
        Self { weights }
    }

    /// Build a custom table, rejecting out-of-range weights and bad sums
    pub fn new(weights: BTreeMap<MetricName, f64>) -> Result<Self, AggregationConfigError> {
        for (metric, weight) in &weights {
            if !(0.0..=1.0).contains(weight) {
                return Err(AggregationConfigError::WeightOutOfRange {
                    metric: metric.to_string(),
                    weight: *weight,
                });
            }
        }

        let sum: f64 = weights.values().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(AggregationConfigError::WeightSum { sum });
        }

        Ok(Self { weights })
    }

    /// Weight for a metric (0 if absent)
    pub fn weight(&self, metric: MetricName) -> f64 {
        self.weights.get(&metric).copied().unwrap_or(0.0)
    }

    /// Sum of all weights
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Iterate over (metric, weight) pairs
    pub fn iter(&self) -> impl Iterator<Item = (MetricName, f64)> + '_ {
        self.weights.iter().map(|(m, w)| (*m, *w))
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_sums_to_one() {
        let table = WeightTable::standard();
        assert!((table.total() - 1.0).abs() <= SUM_TOLERANCE);
        assert_eq!(table.weight(MetricName::Reviewedness), 0.0);
        assert_eq!(table.weight(MetricName::License), 0.20);
    }

    #[test]
    fn test_standard_table_revalidates() {
        let weights: BTreeMap<_, _> = WeightTable::standard().iter().collect();
        assert!(WeightTable::new(weights).is_ok());
    }

    #[test]
    fn test_rejects_bad_sum() {
        let weights = BTreeMap::from([(MetricName::License, 0.5), (MetricName::Size, 0.4)]);
        let err = WeightTable::new(weights).unwrap_err();
        assert!(matches!(err, AggregationConfigError::WeightSum { .. }));
    }

    #[test]
    fn test_rejects_out_of_range_weight() {
        let weights = BTreeMap::from([(MetricName::License, 1.5), (MetricName::Size, -0.5)]);
        let err = WeightTable::new(weights).unwrap_err();
        assert!(matches!(err, AggregationConfigError::WeightOutOfRange { .. }));
    }
}
