//! Bounded exponential backoff for transient fetch failures

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{FetchError, PermanentKind};

/// Retry policy for remote calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Multiplier applied per retry
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Cap on any single delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    200
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            multiplier: default_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Delay before retry number `attempt` (0-based), honouring Retry-After
    pub fn backoff(&self, attempt: u32, err: &FetchError) -> Duration {
        let base = self.initial_backoff_ms as f64 * self.multiplier.powi(attempt as i32);
        let computed = base.min(self.max_backoff_ms as f64) as u64;
        let server = err.retry_after_secs().map(|s| s * 1000).unwrap_or(0);
        Duration::from_millis(computed.max(server.min(self.max_backoff_ms)))
    }

    /// Run `operation` until it succeeds, fails permanently, or the attempt
    /// budget is spent. Exhausting the budget yields
    /// `Permanent { kind: RetriesExhausted }`.
    pub async fn run<F, Fut, T>(&self, operation: F) -> Result<T, FetchError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= attempts {
                        return Err(FetchError::permanent(
                            PermanentKind::RetriesExhausted { attempts },
                            e.url().to_string(),
                            e.to_string(),
                        ));
                    }

                    let delay = self.backoff(attempt - 1, &e);
                    warn!(
                        attempt = attempt,
                        max = attempts,
                        backoff_ms = delay.as_millis() as u64,
                        url = %e.url(),
                        error = %e,
                        "Retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransientKind;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> FetchError {
        FetchError::transient(TransientKind::Server(503), "https://hub/api", "unavailable")
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy::default();
        let err = transient();
        assert_eq!(policy.backoff(0, &err), Duration::from_millis(200));
        assert_eq!(policy.backoff(1, &err), Duration::from_millis(400));
        assert_eq!(policy.backoff(10, &err), Duration::from_millis(5_000));
    }

    #[test]
    fn test_backoff_respects_retry_after() {
        let policy = RetryPolicy::default();
        let err = FetchError::transient(
            TransientKind::RateLimited {
                retry_after_secs: Some(2),
            },
            "u",
            "slow down",
        );
        assert_eq!(policy.backoff(0, &err), Duration::from_millis(2_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let result = policy
            .run(|| {
                let calls = calls.clone();
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(transient())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_escalates_to_permanent() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let result: Result<(), _> = policy
            .run(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;

        assert!(matches!(
            result,
            Err(FetchError::Permanent {
                kind: PermanentKind::RetriesExhausted { attempts: 3 },
                ..
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::default();

        let result: Result<(), _> = policy
            .run(|| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(FetchError::from_status(404, "u", ""))
                }
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
