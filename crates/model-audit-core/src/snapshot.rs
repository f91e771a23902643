//! Normalized repository metadata
//!
//! A [`MetadataSnapshot`] is what the fetcher hands to every evaluator. Fields
//! that could not be retrieved are `None` so evaluators can tell "empty" from
//! "unknown".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::reference::ModelReference;

/// A file in the repository tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoFile {
    /// Path relative to the repository root
    pub path: String,
    /// Size in bytes (0 when the host does not report it)
    pub size_bytes: u64,
}

impl RepoFile {
    pub fn new(path: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            size_bytes,
        }
    }

    /// Lower-cased extension including the dot, e.g. `.safetensors`
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        name.rfind('.')
            .filter(|idx| *idx > 0)
            .map(|idx| name[idx..].to_ascii_lowercase())
    }
}

/// A contributor and their most recent activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub last_active: Option<DateTime<Utc>>,
}

/// Popularity counters; hosts report different subsets, the rest stay 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Popularity {
    pub likes: u64,
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub subscribers: u64,
    pub downloads: u64,
}

/// Linked source code repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeRepository {
    pub reference: ModelReference,
    pub readme: Option<String>,
    pub popularity: Popularity,
    pub last_modified: Option<DateTime<Utc>>,
    pub license: Option<String>,
    pub default_branch: Option<String>,
}

/// Linked dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Canonical dataset id
    pub id: String,
    pub description: Option<String>,
    pub license: Option<String>,
    pub homepage: Option<String>,
    pub citation: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub popularity: Popularity,
    /// Tags or topics attached to the dataset
    pub topics: Vec<String>,
}

/// Pull request review statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewStats {
    /// Merged pull requests inspected
    pub merged: u64,
    /// Of those, how many had an approving or change-requesting review
    pub reviewed: u64,
    /// Lines added by reviewed pull requests
    pub reviewed_additions: u64,
    /// Lines added by all inspected pull requests
    pub total_additions: u64,
}

/// Names of optional snapshot fields, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotField {
    Readme,
    Files,
    Contributors,
    CreatedAt,
    LastModified,
    License,
    Code,
    Dataset,
    ReviewStats,
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SnapshotField::Readme => "readme",
            SnapshotField::Files => "files",
            SnapshotField::Contributors => "contributors",
            SnapshotField::CreatedAt => "created_at",
            SnapshotField::LastModified => "last_modified",
            SnapshotField::License => "license",
            SnapshotField::Code => "code",
            SnapshotField::Dataset => "dataset",
            SnapshotField::ReviewStats => "review_stats",
        };
        f.write_str(s)
    }
}

/// Everything known about a model at fetch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    pub reference: ModelReference,
    pub readme: Option<String>,
    pub files: Option<Vec<RepoFile>>,
    pub contributors: Option<Vec<Contributor>>,
    pub created_at: Option<DateTime<Utc>>,
    pub last_modified: Option<DateTime<Utc>>,
    pub popularity: Popularity,
    pub license: Option<String>,
    /// Dataset ids mentioned in card metadata or README
    #[serde(default)]
    pub dataset_mentions: Vec<String>,
    /// Code repository URLs mentioned in the README
    #[serde(default)]
    pub code_mentions: Vec<String>,
    pub code: Option<CodeRepository>,
    pub dataset: Option<DatasetRecord>,
    pub review_stats: Option<ReviewStats>,
}

impl MetadataSnapshot {
    /// Empty snapshot for a reference; every optional field is unknown
    pub fn new(reference: ModelReference) -> Self {
        Self {
            reference,
            readme: None,
            files: None,
            contributors: None,
            created_at: None,
            last_modified: None,
            popularity: Popularity::default(),
            license: None,
            dataset_mentions: Vec::new(),
            code_mentions: Vec::new(),
            code: None,
            dataset: None,
            review_stats: None,
        }
    }

    /// Optional fields that could not be retrieved
    pub fn missing_fields(&self) -> Vec<SnapshotField> {
        let mut missing = Vec::new();
        if self.readme.is_none() {
            missing.push(SnapshotField::Readme);
        }
        if self.files.is_none() {
            missing.push(SnapshotField::Files);
        }
        if self.contributors.is_none() {
            missing.push(SnapshotField::Contributors);
        }
        if self.created_at.is_none() {
            missing.push(SnapshotField::CreatedAt);
        }
        if self.last_modified.is_none() {
            missing.push(SnapshotField::LastModified);
        }
        if self.license.is_none() {
            missing.push(SnapshotField::License);
        }
        if self.code.is_none() {
            missing.push(SnapshotField::Code);
        }
        if self.dataset.is_none() {
            missing.push(SnapshotField::Dataset);
        }
        if self.review_stats.is_none() {
            missing.push(SnapshotField::ReviewStats);
        }
        missing
    }

    /// The repository that code-level metrics should look at: the linked
    /// code repository, or the primary reference when it is itself a code host
    pub fn code_reference(&self) -> Option<&ModelReference> {
        self.code.as_ref().map(|c| &c.reference).or_else(|| {
            self.reference
                .host()
                .is_code_repository()
                .then_some(&self.reference)
        })
    }

    /// Most recent timestamp across contributors, the model, and its linked
    /// code repository and dataset
    pub fn latest_activity(&self) -> Option<DateTime<Utc>> {
        let contributor_max = self
            .contributors
            .iter()
            .flatten()
            .filter_map(|c| c.last_active)
            .max();
        [
            contributor_max,
            self.last_modified,
            self.created_at,
            self.code.as_ref().and_then(|c| c.last_modified),
            self.dataset.as_ref().and_then(|d| d.last_modified),
        ]
        .into_iter()
        .flatten()
        .max()
    }
}
