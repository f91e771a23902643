//! Dataset quality: documentation, licensing, freshness and adoption of the
//! linked dataset

use async_trait::async_trait;
use model_audit_core::{DatasetRecord, MetadataSnapshot, MetricName};
use tracing::debug;

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct DatasetQualityEvaluator;

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Share of description, license and homepage-or-citation that are filled in
pub fn completeness(dataset: &DatasetRecord) -> f64 {
    let filled = [
        present(&dataset.description),
        present(&dataset.license),
        present(&dataset.homepage) || present(&dataset.citation),
    ]
    .iter()
    .filter(|b| **b)
    .count();
    filled as f64 / 3.0
}

pub fn recency(age_days: Option<f64>) -> f64 {
    match age_days {
        Some(days) if days <= 183.0 => 1.0,
        Some(days) if days <= 548.0 => 0.5,
        Some(_) => 0.2,
        None => 0.5,
    }
}

/// Adoption signal; GitHub-backed datasets report stars and forks, hub
/// datasets likes and downloads
pub fn community(dataset: &DatasetRecord) -> f64 {
    let p = &dataset.popularity;
    let ratio = |value: u64, saturation: f64| (value as f64 / saturation).min(1.0);
    if p.stars > 0 || p.forks > 0 || p.watchers > 0 || p.subscribers > 0 {
        0.5 * ratio(p.stars, 100.0)
            + 0.2 * ratio(p.forks, 50.0)
            + 0.2 * ratio(p.watchers, 100.0)
            + 0.1 * ratio(p.subscribers, 20.0)
    } else {
        0.5 * ratio(p.likes, 100.0) + 0.5 * ratio(p.downloads, 10_000.0)
    }
}

#[async_trait]
impl Evaluator for DatasetQualityEvaluator {
    fn name(&self) -> MetricName {
        MetricName::DatasetQuality
    }

    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let Some(dataset) = &snapshot.dataset else {
            return Ok(Outcome::unavailable("no linked dataset"));
        };

        let completeness = completeness(dataset);
        let license = if present(&dataset.license) { 1.0 } else { 0.0 };
        let recency = recency(dataset.last_modified.map(|t| ctx.age_days(t)));
        let community = community(dataset);
        let topics = if dataset.topics.is_empty() { 0.0 } else { 1.0 };

        let score =
            0.3 * completeness + 0.2 * license + 0.2 * recency + 0.2 * community + 0.1 * topics;

        debug!(dataset = %dataset.id, score, "Dataset quality evaluated");

        Ok(Outcome::full(score)
            .with_component("completeness", completeness)
            .with_component("license", license)
            .with_component("recency", recency)
            .with_component("community", community)
            .with_component("topics", topics))
    }
}
