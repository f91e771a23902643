//! Common test utilities and helpers
//!
//! Spins up wiremock servers standing in for the Hugging Face hub, GitHub
//! and an OpenAI-compatible LLM endpoint, and wires an engine against them.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use model_audit_fetch::{
    build_classifier, GitHubClient, GitHubConfig, GitHubInsights, GitLabClient, GitLabConfig,
    HttpConfig, HttpMetadataFetcher, HubClient, HubConfig, LlmConfig, RateLimiter, RetryPolicy,
};
use model_audit_service::{EngineSettings, EvaluationEngine, FixedClock};
use std::sync::Arc;
use wiremock::MockServer;

pub mod fixtures;

/// Mock upstream services for one test
pub struct Upstream {
    pub hub: MockServer,
    pub github: MockServer,
    pub llm: MockServer,
}

impl Upstream {
    pub async fn start() -> Self {
        Self {
            hub: MockServer::start().await,
            github: MockServer::start().await,
            llm: MockServer::start().await,
        }
    }

    /// Engine without an LLM; classified metrics use heuristics
    pub fn offline_engine(&self) -> EvaluationEngine {
        self.engine_with(None, EngineSettings::default())
    }

    /// Engine that classifies through the mock LLM server
    pub fn llm_engine(&self) -> EvaluationEngine {
        self.engine_with(Some(self.llm.uri()), EngineSettings::default())
    }

    pub fn engine_with(&self, llm_url: Option<String>, settings: EngineSettings) -> EvaluationEngine {
        let http = HttpConfig::default();
        let limiter = RateLimiter::unlimited();
        let retry = RetryPolicy::no_retry();

        let hub = HubClient::new(
            &HubConfig {
                base_url: self.hub.uri(),
                token: None,
            },
            &http,
            limiter.clone(),
            retry.clone(),
        )
        .expect("hub client");
        let github = GitHubClient::new(
            &GitHubConfig {
                api_url: self.github.uri(),
                ..Default::default()
            },
            &http,
            limiter.clone(),
            retry.clone(),
        )
        .expect("github client");
        let gitlab = GitLabClient::new(
            &GitLabConfig {
                api_url: self.github.uri(),
                token: None,
            },
            &http,
            limiter.clone(),
            retry.clone(),
        )
        .expect("gitlab client");
        let classifier = build_classifier(
            &LlmConfig {
                base_url: llm_url,
                model: "test-model".to_string(),
                ..Default::default()
            },
            &http,
            limiter,
            retry,
        )
        .expect("classifier");

        EvaluationEngine::builder(Arc::new(HttpMetadataFetcher::new(
            hub,
            github.clone(),
            gitlab,
        )))
        .classifier(classifier)
        .insights(Arc::new(GitHubInsights::new(github)))
        .clock(Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )))
        .settings(settings)
        .build()
        .expect("engine")
    }
}

/// Assert that two floats agree to within `1e-6`
pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-6,
        "expected {}, got {}",
        expected,
        actual
    );
}
