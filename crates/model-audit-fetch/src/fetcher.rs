//! Metadata fetcher
//!
//! Resolves an [`EvaluationRequest`] into a [`MetadataSnapshot`]. Only the
//! primary metadata call is fatal; every other lookup degrades to `None`.

use async_trait::async_trait;
use model_audit_core::{
    CodeRepository, Contributor, DatasetRecord, EvaluationRequest, HostKind, MetadataSnapshot,
    ModelReference, Popularity,
};
use tracing::{debug, info, instrument, warn};

use crate::error::{FetchError, FetchResult, PermanentKind};
use crate::github::GitHubClient;
use crate::gitlab::GitLabClient;
use crate::hub::HubClient;
use crate::mentions::{code_mentions, dataset_mentions};

/// Produces metadata snapshots
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch everything the evaluators need for `request`
    async fn fetch(&self, request: &EvaluationRequest) -> FetchResult<MetadataSnapshot>;
}

/// Fetcher backed by the Hugging Face, GitHub and GitLab APIs
#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    hub: HubClient,
    github: GitHubClient,
    gitlab: GitLabClient,
}

struct LinkedCode {
    repository: CodeRepository,
    contributors: Option<Vec<Contributor>>,
}

impl HttpMetadataFetcher {
    /// Create a new fetcher from its clients
    pub fn new(hub: HubClient, github: GitHubClient, gitlab: GitLabClient) -> Self {
        Self {
            hub,
            github,
            gitlab,
        }
    }

    async fn fetch_hub_model(&self, request: &EvaluationRequest) -> FetchResult<MetadataSnapshot> {
        let id = request.model.id();
        let (info, readme) = tokio::join!(self.hub.model_info(id), self.hub.model_readme(id));
        let info = info?;
        let readme = soft(readme, "readme", &request.model);

        let mut snapshot = MetadataSnapshot::new(request.model.clone());
        snapshot.files = info.files();
        snapshot.created_at = info.created_at;
        snapshot.last_modified = info.last_modified;
        snapshot.popularity = info.popularity();
        snapshot.license = info.license();

        let mut datasets = info.dataset_ids();
        if let Some(text) = &readme {
            snapshot.code_mentions = code_mentions(text);
            for id in dataset_mentions(text) {
                if !datasets.contains(&id) {
                    datasets.push(id);
                }
            }
        }
        snapshot.dataset_mentions = datasets;
        snapshot.readme = readme;

        self.attach_linked(request, &mut snapshot).await;
        Ok(snapshot)
    }

    async fn fetch_github_model(
        &self,
        request: &EvaluationRequest,
    ) -> FetchResult<MetadataSnapshot> {
        let id = request.model.id();
        let (repo, readme, contributors) = tokio::join!(
            self.github.repo(id),
            self.github.readme(id),
            self.github.contributors(id)
        );
        let repo = repo?;
        let branch = repo.default_branch.clone().unwrap_or_else(|| "main".to_string());
        let files = soft(self.github.tree(id, &branch).await, "files", &request.model);

        let mut snapshot = MetadataSnapshot::new(request.model.clone());
        snapshot.readme = soft(readme, "readme", &request.model);
        snapshot.files = files;
        snapshot.contributors = soft(contributors, "contributors", &request.model);
        snapshot.created_at = repo.created_at;
        snapshot.last_modified = repo.last_modified();
        snapshot.popularity = repo.popularity();
        snapshot.license = repo.license_name();
        if let Some(text) = &snapshot.readme {
            snapshot.code_mentions = code_mentions(text);
            snapshot.dataset_mentions = dataset_mentions(text);
        }

        self.attach_linked(request, &mut snapshot).await;
        Ok(snapshot)
    }

    /// Resolve and fetch the linked code repository and dataset
    async fn attach_linked(&self, request: &EvaluationRequest, snapshot: &mut MetadataSnapshot) {
        let code_ref = request.code.clone().or_else(|| {
            snapshot
                .code_mentions
                .iter()
                .filter_map(|url| ModelReference::parse(url).ok())
                .find(|r| r.host().is_code_repository() && r != &snapshot.reference)
        });
        let dataset_ref = request
            .dataset
            .clone()
            .or_else(|| {
                request
                    .shared_dataset
                    .clone()
                    .filter(|shared| mentions_reference(snapshot, shared))
            })
            .or_else(|| {
                snapshot.dataset_mentions.iter().find_map(|id| {
                    ModelReference::parse(&format!("https://huggingface.co/datasets/{}", id)).ok()
                })
            });

        debug!(
            code = ?code_ref.as_ref().map(|r| r.id()),
            dataset = ?dataset_ref.as_ref().map(|r| r.id()),
            "Resolved linked references"
        );

        let (code, dataset) = tokio::join!(
            async {
                match &code_ref {
                    Some(r) => soft(self.fetch_code(r).await, "code", r),
                    None => None,
                }
            },
            async {
                match &dataset_ref {
                    Some(r) => soft(self.fetch_dataset(r).await, "dataset", r),
                    None => None,
                }
            }
        );

        if let Some(linked) = code {
            if snapshot.contributors.is_none() {
                snapshot.contributors = linked.contributors;
            }
            snapshot.code = Some(linked.repository);
        }
        snapshot.dataset = dataset;
    }

    async fn fetch_code(&self, reference: &ModelReference) -> FetchResult<LinkedCode> {
        let id = reference.id();
        match reference.host() {
            HostKind::GitHub => {
                let (repo, readme, contributors) = tokio::join!(
                    self.github.repo(id),
                    self.github.readme(id),
                    self.github.contributors(id)
                );
                let repo = repo?;
                Ok(LinkedCode {
                    repository: CodeRepository {
                        reference: reference.clone(),
                        readme: soft(readme, "code.readme", reference),
                        popularity: repo.popularity(),
                        last_modified: repo.last_modified(),
                        license: repo.license_name(),
                        default_branch: repo.default_branch.clone(),
                    },
                    contributors: soft(contributors, "code.contributors", reference),
                })
            }
            HostKind::GitLab => {
                let (project, contributors) =
                    tokio::join!(self.gitlab.project(id), self.gitlab.contributors(id));
                let project = project?;
                let branch = project.default_branch.clone().unwrap_or_else(|| "main".to_string());
                let readme = soft(self.gitlab.readme(id, &branch).await, "code.readme", reference);
                Ok(LinkedCode {
                    repository: CodeRepository {
                        reference: reference.clone(),
                        readme,
                        popularity: project.popularity(),
                        last_modified: project.last_activity_at,
                        license: project.license_name(),
                        default_branch: project.default_branch.clone(),
                    },
                    contributors: soft(contributors, "code.contributors", reference),
                })
            }
            HostKind::HuggingFaceSpace => {
                let (space, readme) =
                    tokio::join!(self.hub.space_info(id), self.hub.space_readme(id));
                let space = space?;
                Ok(LinkedCode {
                    repository: CodeRepository {
                        reference: reference.clone(),
                        readme: soft(readme, "code.readme", reference),
                        popularity: space.popularity(),
                        last_modified: space.last_modified,
                        license: space.license(),
                        default_branch: None,
                    },
                    contributors: None,
                })
            }
            other => Err(unsupported(reference, other)),
        }
    }

    async fn fetch_dataset(&self, reference: &ModelReference) -> FetchResult<DatasetRecord> {
        match reference.host() {
            HostKind::HuggingFaceDataset => {
                Ok(DatasetRecord::from(self.hub.dataset_info(reference.id()).await?))
            }
            HostKind::GitHub => {
                let repo = self.github.repo(reference.id()).await?;
                Ok(DatasetRecord {
                    id: repo.full_name.clone(),
                    description: repo.description.clone().filter(|d| !d.trim().is_empty()),
                    license: repo.license_name(),
                    homepage: repo.homepage.clone().filter(|h| !h.trim().is_empty()),
                    citation: None,
                    last_modified: repo.last_modified(),
                    popularity: Popularity {
                        stars: repo.stargazers_count,
                        forks: repo.forks_count,
                        watchers: repo.watchers_count,
                        subscribers: repo.subscribers_count,
                        ..Default::default()
                    },
                    topics: repo.topics.clone(),
                })
            }
            other => Err(unsupported(reference, other)),
        }
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    #[instrument(skip(self, request), fields(url = %request.model))]
    async fn fetch(&self, request: &EvaluationRequest) -> FetchResult<MetadataSnapshot> {
        let snapshot = match request.model.host() {
            HostKind::HuggingFaceModel => self.fetch_hub_model(request).await?,
            HostKind::GitHub => self.fetch_github_model(request).await?,
            other => return Err(unsupported(&request.model, other)),
        };

        let missing = snapshot.missing_fields();
        info!(
            files = snapshot.files.as_ref().map(Vec::len).unwrap_or(0),
            missing = ?missing,
            "Fetched metadata snapshot"
        );
        Ok(snapshot)
    }
}

fn unsupported(reference: &ModelReference, kind: HostKind) -> FetchError {
    FetchError::permanent(
        PermanentKind::Client(400),
        reference.to_string(),
        format!("cannot fetch {} references in this position", kind),
    )
}

/// Whether the README or card metadata refers to `reference`
fn mentions_reference(snapshot: &MetadataSnapshot, reference: &ModelReference) -> bool {
    snapshot.dataset_mentions.iter().any(|id| id == reference.id())
        || snapshot
            .readme
            .as_deref()
            .is_some_and(|readme| readme.contains(reference.url().as_str()))
}

/// Downgrade a non-essential lookup failure to `None`
fn soft<T>(result: FetchResult<T>, field: &str, reference: &ModelReference) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) if e.is_not_found() => {
            debug!(field = field, url = %reference, "Optional metadata not found");
            None
        }
        Err(e) => {
            warn!(field = field, url = %reference, error = %e, "Optional metadata unavailable");
            None
        }
    }
}
