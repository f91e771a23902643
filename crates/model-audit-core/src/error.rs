//! Error types for model auditing

use thiserror::Error;

/// Errors raised while parsing or classifying a model reference.
///
/// These are always fatal for the evaluation they belong to and are raised
/// before any network call is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The input is not a valid absolute URL
    #[error("Malformed reference '{input}': {reason}")]
    Malformed { input: String, reason: String },

    /// The URL points at a host we do not know how to fetch
    #[error("Unsupported host: {0}")]
    UnsupportedHost(String),

    /// The URL is on a supported host but does not name a repository
    #[error("Reference does not name a repository: {0}")]
    MissingRepositoryId(String),

    /// The reference is valid but cannot be the subject of an evaluation
    #[error("Reference kind '{kind}' cannot be evaluated directly: {url}")]
    NotEvaluable { kind: String, url: String },
}

/// The net-score weight table is invalid.
///
/// Raised once when the engine is constructed, never per request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationConfigError {
    /// Weights do not sum to 1.0
    #[error("Metric weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    /// A single weight lies outside [0, 1]
    #[error("Weight for {metric} is {weight}, expected a value in [0, 1]")]
    WeightOutOfRange { metric: String, weight: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_error_display() {
        let err = ReferenceError::UnsupportedHost("example.com".to_string());
        assert_eq!(err.to_string(), "Unsupported host: example.com");
    }

    #[test]
    fn test_weight_sum_error_display() {
        let err = AggregationConfigError::WeightSum { sum: 0.9 };
        assert_eq!(err.to_string(), "Metric weights sum to 0.9, expected 1.0");
    }
}
