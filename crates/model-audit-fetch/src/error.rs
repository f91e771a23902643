//! Fetch-layer error types and conversions
//!
//! Every remote failure is classified as either transient (worth retrying) or
//! permanent. The retry loop turns an exhausted transient failure into a
//! permanent one, so callers only ever see a `Permanent` error escape.

use thiserror::Error;

/// Result type alias for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Why a transient failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Request timed out
    Timeout,
    /// Could not connect or the connection dropped
    Connection,
    /// HTTP 429
    RateLimited {
        /// Server-provided Retry-After, if any
        retry_after_secs: Option<u64>,
    },
    /// HTTP 5xx
    Server(u16),
}

/// Why a permanent failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermanentKind {
    /// HTTP 404
    NotFound,
    /// HTTP 401 or 403
    AccessDenied(u16),
    /// Any other HTTP 4xx
    Client(u16),
    /// The payload did not have the expected shape
    Schema,
    /// A transient failure persisted past the retry budget
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
    },
}

/// Fetch-layer errors
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Retryable failure
    #[error("Transient failure fetching {url}: {message}")]
    Transient {
        kind: TransientKind,
        url: String,
        message: String,
    },

    /// Non-retryable failure
    #[error("Permanent failure fetching {url}: {message}")]
    Permanent {
        kind: PermanentKind,
        url: String,
        message: String,
    },

    /// The HTTP client could not be built
    #[error("HTTP client configuration error: {0}")]
    Configuration(String),
}

impl FetchError {
    /// Build a transient error
    pub fn transient(kind: TransientKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Transient {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Build a permanent error
    pub fn permanent(kind: PermanentKind, url: impl Into<String>, message: impl Into<String>) -> Self {
        FetchError::Permanent {
            kind,
            url: url.into(),
            message: message.into(),
        }
    }

    /// Payload did not match the expected schema
    pub fn schema(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::permanent(PermanentKind::Schema, url, message)
    }

    /// Check if this is a transient error that could be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. })
    }

    /// Check if this error is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            FetchError::Permanent {
                kind: PermanentKind::NotFound,
                ..
            }
        )
    }

    /// URL the failing request targeted
    pub fn url(&self) -> &str {
        match self {
            FetchError::Transient { url, .. } | FetchError::Permanent { url, .. } => url,
            FetchError::Configuration(_) => "",
        }
    }

    /// Server-requested delay before retrying, if any
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            FetchError::Transient {
                kind: TransientKind::RateLimited { retry_after_secs },
                ..
            } => *retry_after_secs,
            _ => None,
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, url: impl Into<String>, body: &str) -> Self {
        let message = format!("HTTP {}: {}", status, truncate(body, 200));
        match status {
            404 => Self::permanent(PermanentKind::NotFound, url, message),
            401 | 403 => Self::permanent(PermanentKind::AccessDenied(status), url, message),
            429 => Self::transient(
                TransientKind::RateLimited {
                    retry_after_secs: None,
                },
                url,
                message,
            ),
            500..=599 => Self::transient(TransientKind::Server(status), url, message),
            _ => Self::permanent(PermanentKind::Client(status), url, message),
        }
    }

    /// Classify a transport-level reqwest error
    pub fn from_reqwest(err: reqwest::Error, url: impl Into<String>) -> Self {
        let url = url.into();
        if err.is_timeout() {
            Self::transient(TransientKind::Timeout, url, err.to_string())
        } else if err.is_connect() || err.is_request() {
            Self::transient(TransientKind::Connection, url, err.to_string())
        } else if err.is_decode() {
            Self::schema(url, err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), url, &err.to_string())
        } else {
            Self::transient(TransientKind::Connection, url, err.to_string())
        }
    }
}

/// Errors from the LLM classification collaborator
///
/// These never escape an evaluation; the evaluator falls back to a heuristic.
#[derive(Debug, Clone, Error)]
pub enum ClassifyError {
    /// No classifier endpoint is configured
    #[error("Classifier not configured")]
    NotConfigured,

    /// The request failed
    #[error("Classifier request failed: {0}")]
    Request(#[from] FetchError),

    /// The reply could not be mapped to a bucket
    #[error("Unparsable classifier reply: {0}")]
    Unparsable(String),

    /// Input text was empty
    #[error("Nothing to classify")]
    EmptyInput,

    /// The caller's time budget ran out
    #[error("Classifier timed out after {0} ms")]
    Timeout(u64),
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
