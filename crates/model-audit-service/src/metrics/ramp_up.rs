//! Ramp-up time: how quickly a newcomer can start using the model

use async_trait::async_trait;
use model_audit_core::{MetadataSnapshot, MetricName};
use model_audit_fetch::mentions::fenced_code_blocks;
use tracing::debug;

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct RampUpEvaluator;

const README_WEIGHT: f64 = 0.4;
const EXAMPLES_WEIGHT: f64 = 0.35;
const POPULARITY_WEIGHT: f64 = 0.25;

const EXAMPLE_DIRS: &[&str] = &["example", "examples", "demo", "demos", "tutorial", "tutorials"];

/// Notebooks and files under example-like directories
pub fn example_files(snapshot: &MetadataSnapshot) -> usize {
    snapshot
        .files
        .iter()
        .flatten()
        .filter(|f| {
            let path = f.path.to_ascii_lowercase();
            path.ends_with(".ipynb") || {
                let mut dirs: Vec<&str> = path.split('/').collect();
                dirs.pop();
                dirs.iter().any(|d| EXAMPLE_DIRS.contains(d))
            }
        })
        .count()
}

/// Logarithmic popularity; saturates at `saturation` likes plus stars
pub fn popularity_score(likes_and_stars: u64, saturation: u64) -> f64 {
    let denominator = (1.0 + saturation as f64).ln();
    if denominator <= 0.0 {
        return 1.0;
    }
    ((1.0 + likes_and_stars as f64).ln() / denominator).min(1.0)
}

#[async_trait]
impl Evaluator for RampUpEvaluator {
    fn name(&self) -> MetricName {
        MetricName::RampUpTime
    }

    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let settings = &ctx.settings.ramp_up;
        let readme = snapshot.readme.as_deref().unwrap_or("");

        let readme_score =
            (readme.chars().count() as f64 / settings.readme_chars.max(1) as f64).min(1.0);

        let examples = example_files(snapshot) + fenced_code_blocks(readme);
        let examples_score = (examples as f64 / settings.examples.max(1) as f64).min(1.0);

        let mut likes_and_stars = snapshot.popularity.likes + snapshot.popularity.stars;
        if let Some(code) = &snapshot.code {
            likes_and_stars += code.popularity.stars;
        }
        let popularity = popularity_score(likes_and_stars, settings.popularity);

        let score = README_WEIGHT * readme_score
            + EXAMPLES_WEIGHT * examples_score
            + POPULARITY_WEIGHT * popularity;

        debug!(examples, likes_and_stars, score, "Ramp-up evaluated");

        let outcome = if snapshot.readme.is_some() {
            Outcome::full(score)
        } else {
            Outcome::degraded(score, "README unavailable")
        };
        Ok(outcome
            .with_component("readme", readme_score)
            .with_component("examples", examples_score)
            .with_component("popularity", popularity))
    }
}
