//! Model and repository references
//!
//! A [`ModelReference`] is a parsed URL classified by hosting service. Parsing
//! is the only place where host-specific URL shapes are understood; everything
//! downstream works with the canonical repository id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::ReferenceError;

/// Hosting service and artifact kind of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKind {
    /// Model repository on the Hugging Face hub
    HuggingFaceModel,
    /// Dataset repository on the Hugging Face hub
    HuggingFaceDataset,
    /// Space (demo application) on the Hugging Face hub
    HuggingFaceSpace,
    /// GitHub repository
    GitHub,
    /// GitLab project
    GitLab,
}

impl HostKind {
    /// Get the string representation of the host kind
    pub fn as_str(&self) -> &'static str {
        match self {
            HostKind::HuggingFaceModel => "huggingface_model",
            HostKind::HuggingFaceDataset => "huggingface_dataset",
            HostKind::HuggingFaceSpace => "huggingface_space",
            HostKind::GitHub => "github",
            HostKind::GitLab => "gitlab",
        }
    }

    /// Whether this kind may be the primary subject of an evaluation
    pub fn is_evaluable(&self) -> bool {
        matches!(self, HostKind::HuggingFaceModel | HostKind::GitHub)
    }

    /// Whether this kind is a source code repository
    pub fn is_code_repository(&self) -> bool {
        matches!(
            self,
            HostKind::GitHub | HostKind::GitLab | HostKind::HuggingFaceSpace
        )
    }
}

impl fmt::Display for HostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable reference to a hosted model, dataset, or code repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelReference {
    url: Url,
    host: HostKind,
    id: String,
}

impl ModelReference {
    /// Parse and classify a reference URL
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed).map_err(|e| ReferenceError::Malformed {
            input: trimmed.to_string(),
            reason: e.to_string(),
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ReferenceError::Malformed {
                input: trimmed.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        let host = url
            .host_str()
            .ok_or_else(|| ReferenceError::Malformed {
                input: trimmed.to_string(),
                reason: "missing host".to_string(),
            })?
            .trim_start_matches("www.")
            .to_ascii_lowercase();

        let parts: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        let (kind, id) = match host.as_str() {
            "huggingface.co" | "hf.co" => Self::classify_hub(&parts, trimmed)?,
            "github.com" => (HostKind::GitHub, Self::owner_repo(&parts, trimmed)?),
            "gitlab.com" => (HostKind::GitLab, Self::gitlab_path(&parts, trimmed)?),
            other => return Err(ReferenceError::UnsupportedHost(other.to_string())),
        };

        Ok(Self {
            url,
            host: kind,
            id,
        })
    }

    fn classify_hub(parts: &[&str], input: &str) -> Result<(HostKind, String), ReferenceError> {
        match parts.first().copied() {
            Some("datasets") => Ok((
                HostKind::HuggingFaceDataset,
                Self::owner_repo(&parts[1..], input)
                    .or_else(|_| Self::single_name(&parts[1..], input))?,
            )),
            Some("spaces") => Ok((
                HostKind::HuggingFaceSpace,
                Self::owner_repo(&parts[1..], input)?,
            )),
            Some(_) => {
                // Legacy hub models ("gpt2") have no owner segment
                let id = match parts.get(1) {
                    Some(second) if !matches!(*second, "tree" | "blob" | "resolve") => {
                        format!("{}/{}", parts[0], second)
                    }
                    _ => parts[0].to_string(),
                };
                Ok((HostKind::HuggingFaceModel, id))
            }
            None => Err(ReferenceError::MissingRepositoryId(input.to_string())),
        }
    }

    fn owner_repo(parts: &[&str], input: &str) -> Result<String, ReferenceError> {
        match (parts.first(), parts.get(1)) {
            (Some(owner), Some(repo)) => {
                let repo = repo.trim_end_matches(".git");
                if repo.is_empty() {
                    return Err(ReferenceError::MissingRepositoryId(input.to_string()));
                }
                Ok(format!("{}/{}", owner, repo))
            }
            _ => Err(ReferenceError::MissingRepositoryId(input.to_string())),
        }
    }

    fn single_name(parts: &[&str], input: &str) -> Result<String, ReferenceError> {
        parts
            .first()
            .map(|name| name.to_string())
            .ok_or_else(|| ReferenceError::MissingRepositoryId(input.to_string()))
    }

    fn gitlab_path(parts: &[&str], input: &str) -> Result<String, ReferenceError> {
        // Everything after "/-/" is a file or tree view inside the project
        let project: Vec<&str> = parts.iter().take_while(|p| **p != "-").copied().collect();
        if project.len() < 2 {
            return Err(ReferenceError::MissingRepositoryId(input.to_string()));
        }
        let mut path = project.join("/");
        if let Some(stripped) = path.strip_suffix(".git") {
            path = stripped.to_string();
        }
        Ok(path)
    }

    /// The original URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Host classification
    pub fn host(&self) -> HostKind {
        self.host
    }

    /// Canonical repository id (`owner/name`, or the full GitLab namespace path)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Owner and repository name for two-segment ids
    pub fn owner_and_name(&self) -> Option<(&str, &str)> {
        self.id.split_once('/')
    }
}

impl fmt::Display for ModelReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl FromStr for ModelReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelReference::parse(s)
    }
}

/// A model reference plus optional explicitly linked artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// The model being evaluated
    pub model: ModelReference,

    /// Explicitly linked source code repository
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ModelReference>,

    /// Explicitly linked training/evaluation dataset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset: Option<ModelReference>,

    /// Dataset linked to a neighbouring model in the same batch; adopted only
    /// when this model's README mentions it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_dataset: Option<ModelReference>,
}

impl EvaluationRequest {
    /// Create a request for a single model reference
    pub fn new(model: ModelReference) -> Self {
        Self {
            model,
            code: None,
            dataset: None,
            shared_dataset: None,
        }
    }

    /// Attach a linked code repository
    pub fn with_code(mut self, code: ModelReference) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a linked dataset
    pub fn with_dataset(mut self, dataset: ModelReference) -> Self {
        self.dataset = Some(dataset);
        self
    }

    /// Offer a dataset from a neighbouring batch entry
    pub fn with_shared_dataset(mut self, dataset: ModelReference) -> Self {
        self.shared_dataset = Some(dataset);
        self
    }

    /// Check that the primary reference can be evaluated and that linked
    /// references have a compatible kind
    pub fn validate(&self) -> Result<(), ReferenceError> {
        if !self.model.host().is_evaluable() {
            return Err(ReferenceError::NotEvaluable {
                kind: self.model.host().to_string(),
                url: self.model.to_string(),
            });
        }
        if let Some(code) = &self.code {
            if !code.host().is_code_repository() {
                return Err(ReferenceError::NotEvaluable {
                    kind: code.host().to_string(),
                    url: code.to_string(),
                });
            }
        }
        for dataset in self.dataset.iter().chain(self.shared_dataset.iter()) {
            if !matches!(dataset.host(), HostKind::HuggingFaceDataset | HostKind::GitHub) {
                return Err(ReferenceError::NotEvaluable {
                    kind: dataset.host().to_string(),
                    url: dataset.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hub_model() {
        let r = ModelReference::parse("https://huggingface.co/google-bert/bert-base-uncased").unwrap();
        assert_eq!(r.host(), HostKind::HuggingFaceModel);
        assert_eq!(r.id(), "google-bert/bert-base-uncased");
        assert_eq!(r.owner_and_name(), Some(("google-bert", "bert-base-uncased")));
    }

    #[test]
    fn test_parse_hub_model_with_tree_path() {
        let r = ModelReference::parse("https://huggingface.co/openai/whisper-tiny/tree/main").unwrap();
        assert_eq!(r.id(), "openai/whisper-tiny");
    }

    #[test]
    fn test_parse_legacy_hub_model() {
        let r = ModelReference::parse("https://huggingface.co/gpt2").unwrap();
        assert_eq!(r.host(), HostKind::HuggingFaceModel);
        assert_eq!(r.id(), "gpt2");
        assert_eq!(r.owner_and_name(), None);
    }

    #[test]
    fn test_parse_hub_dataset() {
        let r = ModelReference::parse("https://huggingface.co/datasets/bookcorpus/bookcorpus").unwrap();
        assert_eq!(r.host(), HostKind::HuggingFaceDataset);
        assert_eq!(r.id(), "bookcorpus/bookcorpus");

        let legacy = ModelReference::parse("https://huggingface.co/datasets/squad").unwrap();
        assert_eq!(legacy.id(), "squad");
    }

    #[test]
    fn test_parse_github_strips_git_suffix() {
        let r = ModelReference::parse("https://github.com/google-research/bert.git").unwrap();
        assert_eq!(r.host(), HostKind::GitHub);
        assert_eq!(r.id(), "google-research/bert");
    }

    #[test]
    fn test_parse_gitlab_nested_namespace() {
        let r = ModelReference::parse("https://gitlab.com/group/sub/project/-/tree/main").unwrap();
        assert_eq!(r.host(), HostKind::GitLab);
        assert_eq!(r.id(), "group/sub/project");
    }

    #[test]
    fn test_parse_rejects_unknown_host() {
        let err = ModelReference::parse("https://example.com/a/b").unwrap_err();
        assert_eq!(err, ReferenceError::UnsupportedHost("example.com".to_string()));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            ModelReference::parse("not a url"),
            Err(ReferenceError::Malformed { .. })
        ));
        assert!(matches!(
            ModelReference::parse("ftp://github.com/a/b"),
            Err(ReferenceError::Malformed { .. })
        ));
        assert!(matches!(
            ModelReference::parse("https://github.com/only-owner"),
            Err(ReferenceError::MissingRepositoryId(_))
        ));
    }

    #[test]
    fn test_request_validation() {
        let model = ModelReference::parse("https://huggingface.co/org/model").unwrap();
        let dataset = ModelReference::parse("https://huggingface.co/datasets/org/data").unwrap();

        assert!(EvaluationRequest::new(model.clone()).validate().is_ok());
        assert!(EvaluationRequest::new(dataset.clone()).validate().is_err());

        let bad = EvaluationRequest::new(model).with_code(dataset);
        assert!(matches!(bad.validate(), Err(ReferenceError::NotEvaluable { .. })));
    }
}
