//! GitHub REST client

use chrono::{DateTime, Utc};
use model_audit_core::{Contributor, Popularity, RepoFile};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::instrument;

use crate::client::{headers, HttpClient, HttpConfig};
use crate::error::FetchResult;
use crate::rate_limit::{RateLimiter, GITHUB_KEY};
use crate::retry::RetryPolicy;

/// Public API endpoint
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

const RAW_MEDIA_TYPE: &str = "application/vnd.github.raw";

/// GitHub client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubConfig {
    #[serde(default = "default_github_url")]
    pub api_url: String,

    /// Personal access token; unauthenticated calls are heavily rate limited
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,

    /// How many recently closed pull requests to inspect for review stats
    #[serde(default = "default_pull_sample")]
    pub pull_sample: u32,
}

fn default_github_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_pull_sample() -> u32 {
    30
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_url(),
            token: None,
            pull_sample: default_pull_sample(),
        }
    }
}

/// `GET /repos/{owner}/{repo}` payload (fields used here)
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub full_name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub watchers_count: u64,
    #[serde(default)]
    pub subscribers_count: u64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub license: Option<GitHubLicense>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

impl GitHubRepo {
    pub fn popularity(&self) -> Popularity {
        Popularity {
            stars: self.stargazers_count,
            forks: self.forks_count,
            watchers: self.watchers_count,
            subscribers: self.subscribers_count,
            ..Default::default()
        }
    }

    /// Most recent of push and metadata update
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.pushed_at.max(self.updated_at)
    }

    /// SPDX id, or the license name when GitHub could not identify it
    pub fn license_name(&self) -> Option<String> {
        self.license.as_ref().and_then(|l| {
            l.spdx_id
                .clone()
                .filter(|id| id != "NOASSERTION")
                .or_else(|| l.name.clone())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubLicense {
    #[serde(default)]
    pub spdx_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct CommitEntry {
    #[serde(default)]
    author: Option<UserRef>,
    commit: CommitDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct UserRef {
    login: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    author: Option<GitSignature>,
}

#[derive(Debug, Clone, Deserialize)]
struct GitSignature {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

/// Closed pull request summary
#[derive(Debug, Clone, Deserialize)]
pub struct PullSummary {
    pub number: u64,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
struct PullDetail {
    #[serde(default)]
    additions: u64,
}

/// A pull request review
#[derive(Debug, Clone, Deserialize)]
pub struct PullReview {
    pub state: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CheckRunsResponse {
    #[serde(default)]
    check_runs: Vec<CheckRun>,
}

/// A CI check run
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub name: String,
    #[serde(default)]
    pub conclusion: Option<String>,
}

/// Client for the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: HttpClient,
    pull_sample: u32,
}

impl GitHubClient {
    /// Create a new GitHub client
    pub fn new(
        config: &GitHubConfig,
        http: &HttpConfig,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> FetchResult<Self> {
        let client = HttpClient::new(
            &config.api_url,
            http,
            limiter,
            GITHUB_KEY,
            retry,
            headers(&[
                ("accept", "application/vnd.github+json"),
                ("x-github-api-version", "2022-11-28"),
            ]),
        )?
        .with_token(config.token.clone());
        Ok(Self {
            http: client,
            pull_sample: config.pull_sample.clamp(1, 100),
        })
    }

    /// Repository metadata
    #[instrument(skip(self))]
    pub async fn repo(&self, id: &str) -> FetchResult<GitHubRepo> {
        self.http.get_json(&format!("/repos/{}", id)).await
    }

    /// README as raw markdown
    #[instrument(skip(self))]
    pub async fn readme(&self, id: &str) -> FetchResult<String> {
        self.http
            .get_text(&format!("/repos/{}/readme", id), Some(RAW_MEDIA_TYPE))
            .await
    }

    /// Blob paths and sizes of the whole tree at `branch`
    #[instrument(skip(self))]
    pub async fn tree(&self, id: &str, branch: &str) -> FetchResult<Vec<RepoFile>> {
        let response: TreeResponse = self
            .http
            .get_json(&format!("/repos/{}/git/trees/{}?recursive=1", id, branch))
            .await?;
        Ok(response
            .tree
            .into_iter()
            .filter(|e| e.kind == "blob")
            .map(|e| RepoFile::new(e.path, e.size.unwrap_or(0)))
            .collect())
    }

    /// Contributors from the most recent commits, with last activity
    #[instrument(skip(self))]
    pub async fn contributors(&self, id: &str) -> FetchResult<Vec<Contributor>> {
        let commits: Vec<CommitEntry> = self
            .http
            .get_json(&format!("/repos/{}/commits?per_page=100", id))
            .await?;
        Ok(contributors_from_commits(commits))
    }

    /// Recently closed pull requests that were merged
    #[instrument(skip(self))]
    pub async fn merged_pulls(&self, id: &str) -> FetchResult<Vec<PullSummary>> {
        let pulls: Vec<PullSummary> = self
            .http
            .get_json(&format!(
                "/repos/{}/pulls?state=closed&per_page={}&sort=updated&direction=desc",
                id, self.pull_sample
            ))
            .await?;
        Ok(pulls.into_iter().filter(|p| p.merged_at.is_some()).collect())
    }

    /// Lines added by a pull request
    #[instrument(skip(self))]
    pub async fn pull_additions(&self, id: &str, number: u64) -> FetchResult<u64> {
        let detail: PullDetail = self
            .http
            .get_json(&format!("/repos/{}/pulls/{}", id, number))
            .await?;
        Ok(detail.additions)
    }

    /// Reviews on a pull request
    #[instrument(skip(self))]
    pub async fn reviews(&self, id: &str, number: u64) -> FetchResult<Vec<PullReview>> {
        self.http
            .get_json(&format!("/repos/{}/pulls/{}/reviews", id, number))
            .await
    }

    /// CI check runs on the head of `git_ref`
    #[instrument(skip(self))]
    pub async fn check_runs(&self, id: &str, git_ref: &str) -> FetchResult<Vec<CheckRun>> {
        let response: CheckRunsResponse = self
            .http
            .get_json(&format!("/repos/{}/commits/{}/check-runs?per_page=100", id, git_ref))
            .await?;
        Ok(response.check_runs)
    }
}

fn contributors_from_commits(commits: Vec<CommitEntry>) -> Vec<Contributor> {
    let mut by_login: HashMap<String, Option<DateTime<Utc>>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for entry in commits {
        let signature = entry.commit.author;
        let login = entry
            .author
            .map(|a| a.login)
            .or_else(|| signature.as_ref().and_then(|s| s.name.clone()));
        let Some(login) = login else {
            continue;
        };
        let date = signature.and_then(|s| s.date);

        match by_login.get_mut(&login) {
            Some(last) => *last = (*last).max(date),
            None => {
                order.push(login.clone());
                by_login.insert(login, date);
            }
        }
    }

    order
        .into_iter()
        .map(|login| {
            let last_active = by_login.get(&login).copied().flatten();
            Contributor { login, last_active }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> GitHubClient {
        let config = GitHubConfig {
            api_url: server.uri(),
            ..Default::default()
        };
        GitHubClient::new(
            &config,
            &HttpConfig::default(),
            RateLimiter::unlimited(),
            RetryPolicy::no_retry(),
        )
        .unwrap()
    }

    #[test]
    fn test_contributors_dedup_with_latest_date() {
        let commits: Vec<CommitEntry> = serde_json::from_value(json!([
            {"author": {"login": "alice"}, "commit": {"author": {"name": "Alice", "date": "2024-03-01T00:00:00Z"}}},
            {"author": {"login": "alice"}, "commit": {"author": {"name": "Alice", "date": "2024-01-01T00:00:00Z"}}},
            {"author": null, "commit": {"author": {"name": "Bob", "date": "2023-06-01T00:00:00Z"}}}
        ]))
        .unwrap();

        let contributors = contributors_from_commits(commits);
        assert_eq!(contributors.len(), 2);
        assert_eq!(contributors[0].login, "alice");
        assert_eq!(
            contributors[0].last_active.unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
        assert_eq!(contributors[1].login, "Bob");
    }

    #[test]
    fn test_license_name_skips_noassertion() {
        let repo: GitHubRepo = serde_json::from_value(json!({
            "full_name": "a/b",
            "license": {"spdx_id": "NOASSERTION", "name": "Other"}
        }))
        .unwrap();
        assert_eq!(repo.license_name().as_deref(), Some("Other"));
    }

    #[tokio::test]
    async fn test_readme_uses_raw_media_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/readme"))
            .and(header("accept", RAW_MEDIA_TYPE))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Title"))
            .expect(1)
            .mount(&server)
            .await;

        let readme = client(&server).await.readme("org/repo").await.unwrap();
        assert_eq!(readme, "# Title");
    }

    #[tokio::test]
    async fn test_tree_keeps_blobs_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/git/trees/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "tree": [
                    {"path": "src", "type": "tree"},
                    {"path": "src/lib.rs", "type": "blob", "size": 120},
                    {"path": "weights/model.bin", "type": "blob", "size": 5000}
                ],
                "truncated": false
            })))
            .mount(&server)
            .await;

        let files = client(&server).await.tree("org/repo", "main").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[1].size_bytes, 5000);
    }

    #[tokio::test]
    async fn test_merged_pulls_filters_unmerged() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/org/repo/pulls"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"number": 1, "merged_at": "2024-01-01T00:00:00Z"},
                {"number": 2, "merged_at": null}
            ])))
            .mount(&server)
            .await;

        let pulls = client(&server).await.merged_pulls("org/repo").await.unwrap();
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].number, 1);
    }
}
