//! Metric names and per-metric results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The closed set of quality metrics
///
/// Declaration order is the canonical metric order used for reporting and for
/// the admission decision's reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    /// Deployability across device classes
    #[serde(rename = "size_score")]
    Size,
    /// License clarity and compatibility
    License,
    /// How quickly a newcomer can get productive
    RampUpTime,
    /// Maintainer concentration risk
    BusFactor,
    /// Availability of dataset and runnable code
    #[serde(rename = "dataset_and_code_score")]
    DatasetAndCode,
    /// Documentation and community of the linked dataset
    DatasetQuality,
    /// Lint and type-check health of the linked code
    CodeQuality,
    /// Evidence behind published performance claims
    PerformanceClaims,
    /// Share of merged changes that went through review
    Reviewedness,
}

impl MetricName {
    /// All metrics in canonical order
    pub const ALL: [MetricName; 9] = [
        MetricName::Size,
        MetricName::License,
        MetricName::RampUpTime,
        MetricName::BusFactor,
        MetricName::DatasetAndCode,
        MetricName::DatasetQuality,
        MetricName::CodeQuality,
        MetricName::PerformanceClaims,
        MetricName::Reviewedness,
    ];

    /// Get the string representation of the metric name
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Size => "size_score",
            MetricName::License => "license",
            MetricName::RampUpTime => "ramp_up_time",
            MetricName::BusFactor => "bus_factor",
            MetricName::DatasetAndCode => "dataset_and_code_score",
            MetricName::DatasetQuality => "dataset_quality",
            MetricName::CodeQuality => "code_quality",
            MetricName::PerformanceClaims => "performance_claims",
            MetricName::Reviewedness => "reviewedness",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricName::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unknown metric: {}", s))
    }
}

/// How completely a metric could be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    /// Computed from all intended inputs
    Full,
    /// Computed from partial data or a fallback heuristic
    Degraded,
    /// Could not be computed; score is 0
    Unavailable,
}

impl Availability {
    /// Get the string representation of the availability
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Full => "full",
            Availability::Degraded => "degraded",
            Availability::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single metric evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    /// Which metric this is
    pub name: MetricName,

    /// Score in [0, 1]
    pub score: f64,

    /// Wall-clock computation time
    pub latency_ms: u64,

    /// Data completeness flag
    pub availability: Availability,

    /// Per-component scores (per device class for size)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, f64>,

    /// Why the result is degraded or unavailable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MetricResult {
    /// Create a result, clamping the score into [0, 1]
    pub fn new(name: MetricName, score: f64, latency_ms: u64, availability: Availability) -> Self {
        Self {
            name,
            score: clamp_unit(score),
            latency_ms,
            availability,
            breakdown: BTreeMap::new(),
            note: None,
        }
    }

    /// Placeholder for a metric that produced nothing usable
    pub fn unavailable(name: MetricName, latency_ms: u64) -> Self {
        Self::new(name, 0.0, latency_ms, Availability::Unavailable)
    }

    /// Attach a component breakdown, clamping each entry
    pub fn with_breakdown(mut self, breakdown: BTreeMap<String, f64>) -> Self {
        self.breakdown = breakdown
            .into_iter()
            .map(|(k, v)| (k, clamp_unit(v)))
            .collect();
        self
    }

    /// Attach a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether the metric was computed at all
    pub fn is_available(&self) -> bool {
        self.availability != Availability::Unavailable
    }
}

/// Clamp a value into [0, 1]; NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_serialize_to_wire_names() {
        for metric in MetricName::ALL {
            let json = serde_json::to_string(&metric).unwrap();
            assert_eq!(json, format!("\"{}\"", metric.as_str()));
            assert_eq!(metric.as_str().parse::<MetricName>().unwrap(), metric);
        }
    }

    #[test]
    fn test_canonical_order_matches_ord() {
        let mut sorted = MetricName::ALL;
        sorted.sort();
        assert_eq!(sorted, MetricName::ALL);
    }

    #[test]
    fn test_score_is_clamped() {
        assert_eq!(MetricResult::new(MetricName::License, 1.7, 0, Availability::Full).score, 1.0);
        assert_eq!(MetricResult::new(MetricName::License, -0.2, 0, Availability::Full).score, 0.0);
        assert_eq!(MetricResult::new(MetricName::License, f64::NAN, 0, Availability::Full).score, 0.0);
    }

    #[test]
    fn test_result_json_omits_empty_optionals() {
        let result = MetricResult::new(MetricName::BusFactor, 0.5, 12, Availability::Degraded);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["availability"], "degraded");
        assert_eq!(json["latency_ms"], 12);
        assert!(json.get("breakdown").is_none());
        assert!(json.get("note").is_none());
        assert_eq!(json["name"], "bus_factor");
    }
}
