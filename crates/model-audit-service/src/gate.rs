//! Admission decision over a finished score card

use model_audit_core::{MetricName, ScoreCard};
use serde::{Deserialize, Serialize};

use crate::settings::DEFAULT_ADMISSION_THRESHOLD;

/// Outcome of the admission check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub accepted: bool,
    /// Metrics below the threshold, in metric order
    pub reasons: Vec<MetricName>,
}

impl Admission {
    /// Failing metric names as strings
    pub fn reason_names(&self) -> Vec<&'static str> {
        self.reasons.iter().map(MetricName::as_str).collect()
    }
}

/// Every metric must reach the threshold; the net score is not considered
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionGate {
    threshold: f64,
}

impl DecisionGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn decide(&self, card: &ScoreCard) -> Admission {
        let reasons: Vec<MetricName> = MetricName::ALL
            .iter()
            .copied()
            .filter(|m| card.score(*m) < self.threshold)
            .collect();
        Admission {
            accepted: reasons.is_empty(),
            reasons,
        }
    }
}

impl Default for DecisionGate {
    fn default() -> Self {
        Self::new(DEFAULT_ADMISSION_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use model_audit_core::{Availability, MetricResult, WeightTable};

    fn card(scores: impl Fn(MetricName) -> f64) -> ScoreCard {
        let results = MetricName::ALL
            .iter()
            .map(|m| MetricResult::new(*m, scores(*m), 1, Availability::Full));
        ScoreCard::from_results(results, &WeightTable::standard(), 1, Utc::now())
    }

    #[test]
    fn test_all_passing_is_accepted() {
        let admission = DecisionGate::default().decide(&card(|_| 0.5));
        assert!(admission.accepted);
        assert!(admission.reasons.is_empty());
    }

    #[test]
    fn test_single_failure_is_named() {
        let admission = DecisionGate::default().decide(&card(|m| {
            if m == MetricName::CodeQuality {
                0.4
            } else {
                0.9
            }
        }));
        assert!(!admission.accepted);
        assert_eq!(admission.reason_names(), vec!["code_quality"]);
    }

    #[test]
    fn test_reasons_follow_metric_order() {
        let admission = DecisionGate::default().decide(&card(|m| match m {
            MetricName::Reviewedness | MetricName::Size | MetricName::BusFactor => 0.1,
            _ => 1.0,
        }));
        assert_eq!(
            admission.reasons,
            vec![MetricName::Size, MetricName::BusFactor, MetricName::Reviewedness]
        );
    }

    #[test]
    fn test_threshold_is_configurable() {
        let strict = DecisionGate::new(0.95);
        let admission = strict.decide(&card(|_| 0.9));
        assert_eq!(admission.reasons.len(), 9);
    }

    #[test]
    fn test_admission_json() {
        let admission = Admission {
            accepted: false,
            reasons: vec![MetricName::DatasetAndCode],
        };
        let json = serde_json::to_value(&admission).unwrap();
        assert_eq!(json["reasons"][0], "dataset_and_code_score");
    }
}
