//! Hugging Face hub client

use chrono::{DateTime, Utc};
use model_audit_core::{DatasetRecord, Popularity, RepoFile};
use reqwest::header::HeaderMap;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use crate::client::{HttpClient, HttpConfig};
use crate::error::FetchResult;
use crate::rate_limit::{RateLimiter, HUB_KEY};
use crate::retry::RetryPolicy;

/// Public hub endpoint
pub const DEFAULT_HUB_URL: &str = "https://huggingface.co";

/// Hub client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_hub_url")]
    pub base_url: String,

    /// Access token for gated repositories
    #[serde(default, skip_serializing)]
    pub token: Option<SecretString>,
}

fn default_hub_url() -> String {
    DEFAULT_HUB_URL.to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            base_url: default_hub_url(),
            token: None,
        }
    }
}

/// A file entry in a hub repository listing
#[derive(Debug, Clone, Deserialize)]
pub struct HubSibling {
    pub rfilename: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub lfs: Option<HubLfs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubLfs {
    pub size: u64,
}

/// `GET /api/models/{id}` and `GET /api/spaces/{id}` payload (fields used here)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubRepoInfo {
    pub id: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub card_data: Option<Value>,
    #[serde(default)]
    pub siblings: Option<Vec<HubSibling>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl HubRepoInfo {
    /// File inventory with LFS sizes preferred over pointer sizes
    pub fn files(&self) -> Option<Vec<RepoFile>> {
        self.siblings.as_ref().map(|siblings| {
            siblings
                .iter()
                .map(|s| {
                    let size = s.lfs.as_ref().map(|l| l.size).or(s.size).unwrap_or(0);
                    RepoFile::new(s.rfilename.clone(), size)
                })
                .collect()
        })
    }

    /// Declared license from card metadata or `license:` tags
    pub fn license(&self) -> Option<String> {
        card_license(self.card_data.as_ref()).or_else(|| tag_value(&self.tags, "license"))
    }

    /// Dataset ids from card metadata and `dataset:` tags
    pub fn dataset_ids(&self) -> Vec<String> {
        let mut ids = string_list(self.card_data.as_ref().and_then(|c| c.get("datasets")));
        for tag in &self.tags {
            if let Some(id) = tag.strip_prefix("dataset:") {
                if !ids.iter().any(|existing| existing == id) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    pub fn popularity(&self) -> Popularity {
        Popularity {
            likes: self.likes,
            downloads: self.downloads,
            ..Default::default()
        }
    }
}

/// `GET /api/datasets/{id}` payload (fields used here)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubDatasetInfo {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub citation: Option<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub card_data: Option<Value>,
    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<HubDatasetInfo> for DatasetRecord {
    fn from(info: HubDatasetInfo) -> Self {
        let card = info.card_data.as_ref();
        let license = card_license(card).or_else(|| tag_value(&info.tags, "license"));
        let homepage = card
            .and_then(|c| c.get("homepage"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let description = info
            .description
            .filter(|d| !d.trim().is_empty())
            .or_else(|| {
                card.and_then(|c| c.get("pretty_name"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });

        DatasetRecord {
            id: info.id,
            description,
            license,
            homepage,
            citation: info.citation.filter(|c| !c.trim().is_empty()),
            last_modified: info.last_modified,
            popularity: Popularity {
                likes: info.likes,
                downloads: info.downloads,
                ..Default::default()
            },
            topics: info.tags,
        }
    }
}

/// Client for the Hugging Face hub REST API
#[derive(Debug, Clone)]
pub struct HubClient {
    http: HttpClient,
}

impl HubClient {
    /// Create a new hub client
    pub fn new(
        config: &HubConfig,
        http: &HttpConfig,
        limiter: RateLimiter,
        retry: RetryPolicy,
    ) -> FetchResult<Self> {
        let client = HttpClient::new(
            &config.base_url,
            http,
            limiter,
            HUB_KEY,
            retry,
            HeaderMap::new(),
        )?
        .with_token(config.token.clone());
        Ok(Self { http: client })
    }

    /// Model metadata including file sizes
    #[instrument(skip(self))]
    pub async fn model_info(&self, id: &str) -> FetchResult<HubRepoInfo> {
        self.http
            .get_json(&format!("/api/models/{}?blobs=true", id))
            .await
    }

    /// Space metadata
    #[instrument(skip(self))]
    pub async fn space_info(&self, id: &str) -> FetchResult<HubRepoInfo> {
        self.http.get_json(&format!("/api/spaces/{}", id)).await
    }

    /// Dataset metadata
    #[instrument(skip(self))]
    pub async fn dataset_info(&self, id: &str) -> FetchResult<HubDatasetInfo> {
        self.http.get_json(&format!("/api/datasets/{}", id)).await
    }

    /// Raw model card
    #[instrument(skip(self))]
    pub async fn model_readme(&self, id: &str) -> FetchResult<String> {
        self.http
            .get_text(&format!("/{}/raw/main/README.md", id), None)
            .await
    }

    /// Raw space README
    #[instrument(skip(self))]
    pub async fn space_readme(&self, id: &str) -> FetchResult<String> {
        self.http
            .get_text(&format!("/spaces/{}/raw/main/README.md", id), None)
            .await
    }
}

fn card_license(card: Option<&Value>) -> Option<String> {
    let value = card?.get("license")?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!joined.is_empty()).then(|| joined.join(", "))
        }
        _ => None,
    }
}

fn tag_value(tags: &[String], prefix: &str) -> Option<String> {
    tags.iter().find_map(|t| {
        t.strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::to_string)
    })
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
