//! Service-layer error types
//!
//! This module defines error types specific to the evaluation engine, mapping
//! reference, fetch and configuration errors to a single caller-facing type.

use model_audit_core::{AggregationConfigError, ReferenceError};
use model_audit_fetch::{ClassifyError, FetchError};
use thiserror::Error;

/// Result type alias for evaluation operations
pub type EvaluationResult<T> = std::result::Result<T, EvaluationError>;

/// Errors that abort an evaluation
///
/// Evaluator failures never show up here; they are folded into the score card
/// as degraded or unavailable metrics.
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// The reference could not be parsed or is not evaluable
    #[error("Invalid reference: {0}")]
    Reference(#[from] ReferenceError),

    /// Primary metadata could not be fetched
    #[error("Metadata fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Engine configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(#[from] AggregationConfigError),
}

impl EvaluationError {
    /// Short machine-readable code for reporting
    pub fn code(&self) -> &'static str {
        match self {
            EvaluationError::Reference(_) => "INVALID_REFERENCE",
            EvaluationError::Fetch(FetchError::Permanent { .. }) => "FETCH_FAILED",
            EvaluationError::Fetch(FetchError::Transient { .. }) => "FETCH_TRANSIENT",
            EvaluationError::Fetch(FetchError::Configuration(_)) => "CLIENT_CONFIG",
            EvaluationError::Config(_) => "INVALID_CONFIG",
        }
    }
}

/// Non-fatal failure inside a single evaluator
#[derive(Error, Debug)]
pub enum EvaluatorError {
    /// A required snapshot field is absent
    #[error("Missing data: {0}")]
    MissingData(String),

    /// A secondary lookup failed
    #[error("Collaborator failed: {0}")]
    Collaborator(String),

    /// The evaluator exceeded its time budget
    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

impl From<FetchError> for EvaluatorError {
    fn from(err: FetchError) -> Self {
        EvaluatorError::Collaborator(err.to_string())
    }
}

impl From<ClassifyError> for EvaluatorError {
    fn from(err: ClassifyError) -> Self {
        EvaluatorError::Collaborator(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model_audit_fetch::PermanentKind;

    #[test]
    fn test_reference_error_conversion() {
        let err: EvaluationError = ReferenceError::UnsupportedHost("example.com".into()).into();
        assert_eq!(err.code(), "INVALID_REFERENCE");
        assert!(err.to_string().contains("example.com"));
    }

    #[test]
    fn test_fetch_error_conversion() {
        let err: EvaluationError =
            FetchError::permanent(PermanentKind::NotFound, "https://hub/x", "HTTP 404").into();
        assert_eq!(err.code(), "FETCH_FAILED");
    }
}
