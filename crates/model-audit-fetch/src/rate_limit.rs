//! Client-side rate limiting
//!
//! This module provides a keyed token bucket limiter shared by every outbound
//! HTTP client. One limiter is built at startup and handed to each client;
//! each remote service uses its own key so a slow service never starves another.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Key used by the Hugging Face client
pub const HUB_KEY: &str = "hub";
/// Key used by the GitHub client
pub const GITHUB_KEY: &str = "github";
/// Key used by the GitLab client
pub const GITLAB_KEY: &str = "gitlab";
/// Key used by the LLM classifier
pub const LLM_KEY: &str = "llm";

/// Rate limit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum number of requests allowed per window
    pub max_requests: u32,

    /// Time window in seconds
    pub window_secs: u64,

    /// Whether rate limiting is enabled
    pub enabled: bool,

    /// Per-key overrides of `max_requests`
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub per_key: HashMap<String, u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 60,
            window_secs: 60,
            enabled: true,
            per_key: HashMap::new(),
        }
    }
}

impl RateLimitConfig {
    /// Create a new rate limit configuration
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
            ..Default::default()
        }
    }

    /// Disable rate limiting
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set max requests
    pub fn with_max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Set window in seconds
    pub fn with_window_secs(mut self, window_secs: u64) -> Self {
        self.window_secs = window_secs;
        self
    }

    /// Override the request budget for one key
    pub fn with_key_limit(mut self, key: impl Into<String>, max_requests: u32) -> Self {
        self.per_key.insert(key.into(), max_requests);
        self
    }

    fn capacity_for(&self, key: &str) -> u32 {
        self.per_key
            .get(key)
            .copied()
            .unwrap_or(self.max_requests)
            .max(1)
    }
}

/// Shared keyed rate limiter
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: Arc<RateLimitConfig>,
    storage: Arc<Mutex<HashMap<String, TokenBucket>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config: Arc::new(config),
            storage: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(RateLimitConfig::disabled())
    }

    /// Get configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Take a token for `key` without waiting
    pub async fn try_acquire(&self, key: &str) -> bool {
        if !self.config.enabled {
            return true;
        }
        let mut storage = self.storage.lock().await;
        self.bucket(&mut storage, key).try_consume(1.0)
    }

    /// Wait until a token for `key` is available, then take it
    pub async fn acquire(&self, key: &str) {
        if !self.config.enabled {
            return;
        }
        loop {
            let wait = {
                let mut storage = self.storage.lock().await;
                let bucket = self.bucket(&mut storage, key);
                if bucket.try_consume(1.0) {
                    return;
                }
                bucket.time_until_available()
            };
            debug!(key = %key, wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    fn bucket<'a>(
        &self,
        storage: &'a mut HashMap<String, TokenBucket>,
        key: &str,
    ) -> &'a mut TokenBucket {
        storage.entry(key.to_string()).or_insert_with(|| {
            TokenBucket::new(self.config.capacity_for(key), self.config.window_secs)
        })
    }
}

/// Token bucket for rate limiting
#[derive(Debug, Clone)]
struct TokenBucket {
    /// Number of tokens currently available
    tokens: f64,

    /// Last refill instant
    last_refill: Instant,

    /// Maximum tokens (capacity)
    capacity: f64,

    /// Refill rate (tokens per second)
    refill_rate: f64,
}

impl TokenBucket {
    /// Create a new token bucket
    fn new(capacity: u32, window_secs: u64) -> Self {
        let refill_rate = capacity as f64 / window_secs.max(1) as f64;
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
            capacity: capacity as f64,
            refill_rate,
        }
    }

    /// Refill tokens based on elapsed time
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
            self.last_refill = now;
        }
    }

    /// Try to consume a token
    fn try_consume(&mut self, count: f64) -> bool {
        self.refill();

        if self.tokens >= count {
            self.tokens -= count;
            true
        } else {
            false
        }
    }

    /// Time until the next token is available
    fn time_until_available(&self) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }

        let tokens_needed = 1.0 - self.tokens;
        Duration::from_secs_f64(tokens_needed / self.refill_rate).max(Duration::from_millis(1))
    }
}
