//! Code quality: CI health and adoption of the linked code repository

use async_trait::async_trait;
use model_audit_core::{clamp_unit, MetadataSnapshot, MetricName};
use tracing::{debug, instrument, warn};

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct CodeQualityEvaluator;

pub fn stars_score(stars: u64) -> f64 {
    match stars {
        0 => 0.0,
        1..=49 => 0.5,
        _ => 1.0,
    }
}

#[async_trait]
impl Evaluator for CodeQualityEvaluator {
    fn name(&self) -> MetricName {
        MetricName::CodeQuality
    }

    #[instrument(skip_all, fields(metric = "code_quality"))]
    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let Some(repo) = snapshot.code_reference() else {
            return Ok(Outcome::unavailable("no linked code repository"));
        };

        let stars = snapshot
            .code
            .as_ref()
            .map(|c| c.popularity.stars)
            .unwrap_or(snapshot.popularity.stars);
        let popularity = stars_score(stars);

        let signals = match ctx.insights.code_signals(repo).await {
            Ok(signals) => signals,
            Err(err) => {
                warn!(repo = %repo, error = %err, "Code signals unavailable");
                return Ok(Outcome::degraded(popularity, format!("CI signals unavailable: {}", err))
                    .with_component("popularity", popularity));
            }
        };

        let mut outcome = Outcome::full(0.0).with_component("popularity", popularity);
        let mut components = vec![popularity];
        let mut missing = Vec::new();
        for (name, value) in [
            ("lint", signals.lint_pass_rate),
            ("typecheck", signals.typecheck_pass_rate),
        ] {
            match value {
                Some(v) => {
                    components.push(v);
                    outcome = outcome.with_component(name, v);
                }
                None => missing.push(name),
            }
        }

        let score = components.iter().sum::<f64>() / components.len() as f64;
        debug!(repo = %repo, score, "Code quality evaluated");

        if missing.is_empty() {
            outcome.score = clamp_unit(score);
            Ok(outcome)
        } else {
            let mut degraded = Outcome::degraded(score, format!("no {} signal", missing.join(" or ")));
            degraded.breakdown = outcome.breakdown;
            Ok(degraded)
        }
    }
}
