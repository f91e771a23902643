//! Reviewedness: share of merged changes that went through code review

use async_trait::async_trait;
use model_audit_core::{HostKind, MetadataSnapshot, MetricName};
use tracing::{debug, instrument, warn};

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct ReviewednessEvaluator;

#[async_trait]
impl Evaluator for ReviewednessEvaluator {
    fn name(&self) -> MetricName {
        MetricName::Reviewedness
    }

    #[instrument(skip_all, fields(metric = "reviewedness"))]
    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let stats = match snapshot.review_stats {
            Some(stats) => stats,
            None => {
                let Some(repo) = snapshot
                    .code_reference()
                    .filter(|r| r.host() == HostKind::GitHub)
                else {
                    return Ok(Outcome::unavailable("no linked GitHub repository"));
                };
                match ctx.insights.review_stats(repo).await {
                    Ok(stats) => stats,
                    Err(err) => {
                        warn!(repo = %repo, error = %err, "Review statistics unavailable");
                        return Err(err.into());
                    }
                }
            }
        };

        if stats.merged == 0 {
            return Ok(Outcome::degraded(0.0, "no merged pull requests"));
        }

        let fraction = stats.reviewed.min(stats.merged) as f64 / stats.merged as f64;
        let mut outcome = Outcome::full(fraction).with_component("merged_reviewed", fraction);
        if stats.total_additions > 0 {
            let weighted = stats.reviewed_additions as f64 / stats.total_additions as f64;
            outcome = outcome.with_component("additions_reviewed", weighted);
        }

        debug!(
            merged = stats.merged,
            reviewed = stats.reviewed,
            score = outcome.score,
            "Reviewedness evaluated"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::{context_with, hub_snapshot, offline_context, StubInsights};
    use model_audit_core::{Availability, ModelReference, ReviewStats};
    use model_audit_fetch::UnavailableClassifier;
    use std::sync::Arc;

    fn github_snapshot() -> MetadataSnapshot {
        MetadataSnapshot::new(ModelReference::parse("https://github.com/org/repo").unwrap())
    }

    fn insights(stats: ReviewStats) -> EvaluationContext {
        context_with(
            Arc::new(UnavailableClassifier),
            Arc::new(StubInsights {
                signals: None,
                reviews: Some(stats),
            }),
        )
    }

    #[tokio::test]
    async fn test_fraction_of_reviewed_merges() {
        let ctx = insights(ReviewStats {
            merged: 4,
            reviewed: 3,
            reviewed_additions: 900,
            total_additions: 1_000,
        });

        let outcome = ReviewednessEvaluator
            .evaluate(&github_snapshot(), &ctx)
            .await
            .unwrap();
        assert_eq!(outcome.score, 0.75);
        assert_eq!(outcome.breakdown["additions_reviewed"], 0.9);
        assert_eq!(outcome.availability, Availability::Full);
    }

    #[tokio::test]
    async fn test_snapshot_stats_take_precedence() {
        let mut snapshot = github_snapshot();
        snapshot.review_stats = Some(ReviewStats {
            merged: 2,
            reviewed: 2,
            ..Default::default()
        });

        let outcome = ReviewednessEvaluator
            .evaluate(&snapshot, &offline_context())
            .await
            .unwrap();
        assert_eq!(outcome.score, 1.0);
    }

    #[tokio::test]
    async fn test_no_merges_is_zero_degraded() {
        let outcome = ReviewednessEvaluator
            .evaluate(&github_snapshot(), &insights(ReviewStats::default()))
            .await
            .unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.availability, Availability::Degraded);
    }

    #[tokio::test]
    async fn test_hub_model_without_code_is_unavailable() {
        let outcome = ReviewednessEvaluator
            .evaluate(&hub_snapshot(), &offline_context())
            .await
            .unwrap();
        assert_eq!(outcome.availability, Availability::Unavailable);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_an_error() {
        let result = ReviewednessEvaluator
            .evaluate(&github_snapshot(), &offline_context())
            .await;
        assert!(matches!(result, Err(EvaluatorError::Collaborator(_))));
    }
}
