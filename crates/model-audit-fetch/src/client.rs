//! Shared HTTP plumbing
//!
//! [`HttpClient`] is a thin wrapper over `reqwest::Client` that every service
//! client goes through. Each request takes a rate-limit token, runs under the
//! retry policy, and maps status codes into [`FetchError`].

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::{RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, FetchResult, TransientKind};
use crate::rate_limit::RateLimiter;
use crate::retry::RetryPolicy;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Default user agent
pub const DEFAULT_USER_AGENT: &str = concat!("model-audit/", env!("CARGO_PKG_VERSION"));

/// Transport settings shared by all clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header value
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Rate-limited, retrying HTTP client bound to one remote service
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
    limiter_key: &'static str,
    retry: RetryPolicy,
    token: Option<SecretString>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("limiter_key", &self.limiter_key)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

impl HttpClient {
    /// Build a client for `base_url`
    pub fn new(
        base_url: impl Into<String>,
        config: &HttpConfig,
        limiter: RateLimiter,
        limiter_key: &'static str,
        retry: RetryPolicy,
        default_headers: HeaderMap,
    ) -> FetchResult<Self> {
        let inner = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers)
            .build()
            .map_err(|e| FetchError::Configuration(e.to_string()))?;

        Ok(Self {
            inner,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter,
            limiter_key,
            retry,
            token: None,
        })
    }

    /// Send a bearer token with every request
    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET and decode a JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        let url = self.url(path);
        let url = url.as_str();
        self.retry
            .run(move || async move {
                let response = self.send(self.inner.get(url), url).await?;
                response
                    .json::<T>()
                    .await
                    .map_err(|e| FetchError::schema(url, e.to_string()))
            })
            .await
    }

    /// GET a text body, optionally overriding the Accept header
    pub async fn get_text(&self, path: &str, accept: Option<&str>) -> FetchResult<String> {
        let url = self.url(path);
        let url = url.as_str();
        self.retry
            .run(move || async move {
                let mut request = self.inner.get(url);
                if let Some(accept) = accept {
                    request = request.header(ACCEPT, accept);
                }
                let response = self.send(request, url).await?;
                response
                    .text()
                    .await
                    .map_err(|e| FetchError::from_reqwest(e, url))
            })
            .await
    }

    /// POST a JSON body and decode a JSON reply
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> FetchResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let url = url.as_str();
        self.retry
            .run(move || async move {
                let response = self.send(self.inner.post(url).json(body), url).await?;
                response
                    .json::<T>()
                    .await
                    .map_err(|e| FetchError::schema(url, e.to_string()))
            })
            .await
    }

    async fn send(&self, mut request: RequestBuilder, url: &str) -> FetchResult<Response> {
        self.limiter.acquire(self.limiter_key).await;

        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        debug!(url = %url, service = self.limiter_key, "HTTP request");
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, url))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        debug!(url = %url, status = status.as_u16(), "HTTP request failed");

        Err(with_retry_after(
            FetchError::from_status(status.as_u16(), url, &body),
            retry_after,
        ))
    }
}

/// Attach a Retry-After value to a 429 error
fn with_retry_after(err: FetchError, retry_after: Option<u64>) -> FetchError {
    match err {
        FetchError::Transient {
            kind: TransientKind::RateLimited { .. },
            url,
            message,
        } => FetchError::Transient {
            kind: TransientKind::RateLimited {
                retry_after_secs: retry_after,
            },
            url,
            message,
        },
        other => other,
    }
}

/// Build a header map from static pairs
pub fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    map
}
