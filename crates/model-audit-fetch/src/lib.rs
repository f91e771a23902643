//! Fetch layer for model auditing
//!
//! This crate talks to the outside world on behalf of the evaluation engine:
//! - Hugging Face hub, GitHub and GitLab REST clients
//! - A [`MetadataFetcher`] that assembles a `MetadataSnapshot`
//! - [`RepositoryInsights`] for secondary CI and review lookups
//! - An LLM [`Classifier`] speaking the OpenAI chat completions protocol
//! - A keyed token-bucket [`RateLimiter`] shared by every client
//! - Bounded retry with exponential backoff for transient failures
//!
//! # Example
//!
//! ```rust,no_run
//! use model_audit_fetch::{
//!     GitHubClient, GitHubConfig, GitLabClient, GitLabConfig, HttpConfig, HttpMetadataFetcher,
//!     HubClient, HubConfig, MetadataFetcher, RateLimitConfig, RateLimiter, RetryPolicy,
//! };
//! use model_audit_core::{EvaluationRequest, ModelReference};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = HttpConfig::default();
//! let limiter = RateLimiter::new(RateLimitConfig::new(60, 60));
//! let retry = RetryPolicy::default();
//!
//! let fetcher = HttpMetadataFetcher::new(
//!     HubClient::new(&HubConfig::default(), &http, limiter.clone(), retry.clone())?,
//!     GitHubClient::new(&GitHubConfig::default(), &http, limiter.clone(), retry.clone())?,
//!     GitLabClient::new(&GitLabConfig::default(), &http, limiter, retry)?,
//! );
//!
//! let reference = ModelReference::parse("https://huggingface.co/google-bert/bert-base-uncased")?;
//! let snapshot = fetcher.fetch(&EvaluationRequest::new(reference)).await?;
//! println!("missing: {:?}", snapshot.missing_fields());
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use model_audit_core;

pub mod client;
pub mod error;
pub mod fetcher;
pub mod github;
pub mod gitlab;
pub mod hub;
pub mod insights;
pub mod llm;
pub mod mentions;
pub mod rate_limit;
pub mod retry;

// Re-exports for convenience
pub use client::{HttpClient, HttpConfig};
pub use error::{ClassifyError, FetchError, FetchResult, PermanentKind, TransientKind};
pub use fetcher::{HttpMetadataFetcher, MetadataFetcher};
pub use github::{GitHubClient, GitHubConfig};
pub use gitlab::{GitLabClient, GitLabConfig};
pub use hub::{HubClient, HubConfig};
pub use insights::{CodeSignals, GitHubInsights, RepositoryInsights, UnavailableInsights};
pub use llm::{
    build_classifier, Bucket, Classification, Classifier, HttpClassifier, LlmConfig, Taxonomy,
    UnavailableClassifier,
};
pub use rate_limit::{RateLimitConfig, RateLimiter};
pub use retry::RetryPolicy;

/// Fetch layer version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
