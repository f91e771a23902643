//! Dataset and code availability: whether training data and runnable code are
//! documented alongside the model

use async_trait::async_trait;
use model_audit_core::{MetadataSnapshot, MetricName};
use model_audit_fetch::mentions::fenced_code_blocks;
use model_audit_fetch::{Bucket, Taxonomy};
use tracing::{debug, warn};

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct DatasetAndCodeEvaluator;

pub fn taxonomy() -> Taxonomy {
    Taxonomy {
        name: "dataset_and_code".to_string(),
        instructions: "You read the documentation of a machine learning model. Judge how \
                       well it documents the training dataset and provides runnable example code."
            .to_string(),
        buckets: vec![
            Bucket::new(
                "both_documented",
                1.0,
                "the dataset and runnable code are both clearly documented",
            ),
            Bucket::new(
                "both_incomplete",
                0.75,
                "both a dataset and code are present but the documentation is incomplete",
            ),
            Bucket::new(
                "one_or_sparse",
                0.5,
                "only one of dataset or code is present, or both are only briefly mentioned",
            ),
            Bucket::new("neither", 0.0, "neither a dataset nor code is documented"),
        ],
    }
}

/// Per-document scores: every document empty is 0, every document strong is
/// 1, anything else is their mean
pub fn combine(scores: &[f64]) -> f64 {
    if scores.is_empty() || scores.iter().all(|s| *s <= 0.0) {
        0.0
    } else if scores.iter().all(|s| *s >= 0.9) {
        1.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

/// Mention-based fallback
pub fn heuristic_score(snapshot: &MetadataSnapshot, readme: &str) -> f64 {
    let has_dataset = snapshot.dataset.is_some() || !snapshot.dataset_mentions.is_empty();
    let has_code = snapshot.code.is_some() || !snapshot.code_mentions.is_empty();
    match (has_dataset, has_code) {
        (true, true) if fenced_code_blocks(readme) > 0 => 1.0,
        (true, true) => 0.75,
        (true, false) | (false, true) => 0.5,
        (false, false) => 0.0,
    }
}

#[async_trait]
impl Evaluator for DatasetAndCodeEvaluator {
    fn name(&self) -> MetricName {
        MetricName::DatasetAndCode
    }

    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let readme = snapshot
            .readme
            .as_deref()
            .ok_or_else(|| EvaluatorError::MissingData("README".to_string()))?;

        let mut documents = vec![("model_readme", readme)];
        if let Some(code_readme) = snapshot.code.as_ref().and_then(|c| c.readme.as_deref()) {
            documents.push(("code_readme", code_readme));
        }

        let taxonomy = taxonomy();
        let mut outcome = Outcome::full(0.0);
        let mut scores = Vec::with_capacity(documents.len());
        for (label, text) in documents {
            if text.trim().is_empty() {
                scores.push(0.0);
                outcome = outcome.with_component(label, 0.0);
                continue;
            }
            match ctx.classify(text, &taxonomy).await {
                Ok(c) => {
                    debug!(document = label, bucket = %c.bucket, "Dataset and code classified");
                    scores.push(c.score);
                    outcome = outcome.with_component(label, c.score);
                }
                Err(err) => {
                    warn!(error = %err, "Dataset and code classifier unavailable, counting mentions");
                    return Ok(Outcome::degraded(
                        heuristic_score(snapshot, readme),
                        format!("mention heuristic: {}", err),
                    ));
                }
            }
        }

        outcome.score = combine(&scores);
        Ok(outcome)
    }
}
