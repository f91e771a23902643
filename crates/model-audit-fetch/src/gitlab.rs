//! GitLab REST client (linked repositories only)

use chrono::{DateTime, Utc};
use model_audit_core::{Contributor, Popularity};
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::form_urlencoded::byte_serialize;

use crate::client::{HttpClient, HttpConfig};
use crate::error::FetchResult;
use crate::rate_limit::{RateLimiter, GITLAB_KEY};
use crate::retry::RetryPolicy;

/// Public API endpoint
pub const DEFAULT_GITLAB_API_URL: &str = "https://gitlab.com/api/v4";

/// GitLab client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabConfig {
    #[serde(default = "default_gitlab_url")]
    pub api_url: String,

    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,
}

fn default_gitlab_url() -> String {
    DEFAULT_GITLAB_API_URL.to_string()
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            api_url: default_gitlab_url(),
            token: None,
        }
    }
}

/// `GET /projects/{id}` payload (fields used here)
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub path_with_namespace: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub star_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub last_activity_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub license: Option<GitLabLicense>,
}

impl GitLabProject {
    pub fn popularity(&self) -> Popularity {
        Popularity {
            stars: self.star_count,
            forks: self.forks_count,
            ..Default::default()
        }
    }

    pub fn license_name(&self) -> Option<String> {
        self.license
            .as_ref()
            .and_then(|l| l.key.clone().or_else(|| l.name.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitLabLicense {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GitLabContributor {
    name: String,
}

/// Client for the GitLab REST API
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: HttpClient,
}

impl GitLabClient {
    /// Create a new GitLab client
    pub fn new(
        config: &GitLabConfig,
        http: &HttpConfig,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> FetchResult<Self> {
        let client = HttpClient::new(
            &config.api_url,
            http,
            limiter,
            GITLAB_KEY,
            retry,
            HeaderMap::new(),
        )?
        .with_token(config.token.clone());
        Ok(Self { http: client })
    }

    /// Project metadata
    #[instrument(skip(self))]
    pub async fn project(&self, path: &str) -> FetchResult<GitLabProject> {
        self.http
            .get_json(&format!("/projects/{}?license=true", encode(path)))
            .await
    }

    /// README at the default branch
    #[instrument(skip(self))]
    pub async fn readme(&self, path: &str, branch: &str) -> FetchResult<String> {
        self.http
            .get_text(
                &format!(
                    "/projects/{}/repository/files/README.md/raw?ref={}",
                    encode(path),
                    encode(branch)
                ),
                None,
            )
            .await
    }

    /// Contributor names; GitLab does not report per-contributor activity
    #[instrument(skip(self))]
    pub async fn contributors(&self, path: &str) -> FetchResult<Vec<Contributor>> {
        let contributors: Vec<GitLabContributor> = self
            .http
            .get_json(&format!(
                "/projects/{}/repository/contributors?per_page=100",
                encode(path)
            ))
            .await?;
        Ok(contributors
            .into_iter()
            .map(|c| Contributor {
                login: c.name,
                last_active: None,
            })
            .collect())
    }
}

fn encode(segment: &str) -> String {
    byte_serialize(segment.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_project_path_is_encoded() {
        assert_eq!(encode("group/sub/project"), "group%2Fsub%2Fproject");
    }

    #[tokio::test]
    async fn test_project_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/projects/group%2Fproject"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "path_with_namespace": "group/project",
                "default_branch": "main",
                "star_count": 7,
                "forks_count": 2,
                "last_activity_at": "2024-02-01T00:00:00Z",
                "license": {"key": "mit", "name": "MIT License"}
            })))
            .mount(&server)
            .await;

        let config = GitLabConfig {
            api_url: server.uri(),
            token: None,
        };
        let client = GitLabClient::new(
            &config,
            &HttpConfig::default(),
            RateLimiter::unlimited(),
            RetryPolicy::no_retry(),
        )
        .unwrap();
        let project = client.project("group/project").await.unwrap();
        assert_eq!(project.popularity().stars, 7);
        assert_eq!(project.license_name().as_deref(), Some("mit"));
    }
}
