//! Bus factor: breadth of the contributor base, discounted by inactivity

use async_trait::async_trait;
use model_audit_core::{MetadataSnapshot, MetricName};
use std::collections::HashSet;
use tracing::debug;

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub struct BusFactorEvaluator;

/// Contributors needed for full breadth credit
const SATURATION: f64 = 10.0;

/// Freshness halves every this many days
const HALF_LIFE_DAYS: f64 = 365.0;

pub fn freshness(age_days: f64) -> f64 {
    0.5_f64.powf(age_days.max(0.0) / HALF_LIFE_DAYS)
}

#[async_trait]
impl Evaluator for BusFactorEvaluator {
    fn name(&self) -> MetricName {
        MetricName::BusFactor
    }

    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let latest = snapshot.latest_activity();

        let (unique, known) = match &snapshot.contributors {
            Some(contributors) => {
                let logins: HashSet<String> = contributors
                    .iter()
                    .map(|c| c.login.to_ascii_lowercase())
                    .collect();
                (logins.len(), true)
            }
            None if latest.is_none() => {
                return Ok(Outcome::unavailable("no contributor or activity data"));
            }
            None => (1, false),
        };

        if unique == 0 && latest.is_none() {
            return Ok(Outcome::full(0.0).with_note("no contributors and no commit history"));
        }

        let breadth = (unique as f64 / SATURATION).min(1.0);
        let fresh = latest.map(|t| freshness(ctx.age_days(t))).unwrap_or(0.0);
        let score = breadth * fresh;

        debug!(contributors = unique, breadth, freshness = fresh, "Bus factor evaluated");

        let outcome = if known {
            Outcome::full(score)
        } else {
            Outcome::degraded(score, "contributor list unavailable, assuming one maintainer")
        };
        Ok(outcome
            .with_component("breadth", breadth)
            .with_component("freshness", fresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::{hub_snapshot, now, offline_context};
    use chrono::Duration;
    use model_audit_core::{Availability, CodeRepository, Contributor, ModelReference, Popularity};

    fn contributor(login: &str, days_ago: i64) -> Contributor {
        Contributor {
            login: login.to_string(),
            last_active: Some(now() - Duration::days(days_ago)),
        }
    }

    #[test]
    fn test_freshness_half_life() {
        assert_eq!(freshness(0.0), 1.0);
        assert!((freshness(365.0) - 0.5).abs() < 1e-12);
        assert!((freshness(730.0) - 0.25).abs() < 1e-12);
        assert_eq!(freshness(-10.0), 1.0);
    }

    #[tokio::test]
    async fn test_zero_contributors_no_history_is_zero() {
        let mut snapshot = hub_snapshot();
        snapshot.contributors = Some(Vec::new());

        let outcome = BusFactorEvaluator
            .evaluate(&snapshot, &offline_context())
            .await
            .unwrap();
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.availability, Availability::Full);
    }

    #[tokio::test]
    async fn test_active_broad_team() {
        let mut snapshot = hub_snapshot();
        snapshot.contributors = Some(
            (0..12)
                .map(|i| contributor(&format!("dev{}", i), 0))
                .collect(),
        );

        let outcome = BusFactorEvaluator
            .evaluate(&snapshot, &offline_context())
            .await
            .unwrap();
        assert_eq!(outcome.score, 1.0);
    }

    #[tokio::test]
    async fn test_duplicate_logins_and_stale_activity() {
        let mut snapshot = hub_snapshot();
        snapshot.contributors = Some(vec![
            contributor("alice", 365),
            contributor("Alice", 400),
            contributor("bob", 500),
        ]);

        let outcome = BusFactorEvaluator
            .evaluate(&snapshot, &offline_context())
            .await
            .unwrap();
        assert!((outcome.score - 0.2 * 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_contributors_assume_single_maintainer() {
        let mut snapshot = hub_snapshot();
        snapshot.last_modified = Some(now());

        let outcome = BusFactorEvaluator
            .evaluate(&snapshot, &offline_context())
            .await
            .unwrap();
        assert_eq!(outcome.availability, Availability::Degraded);
        assert!((outcome.score - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_active_code_repository_keeps_stale_card_fresh() {
        let mut snapshot = hub_snapshot();
        snapshot.last_modified = Some(now() - Duration::days(730));
        snapshot.code = Some(CodeRepository {
            reference: ModelReference::parse("https://github.com/org/code").unwrap(),
            readme: None,
            popularity: Popularity::default(),
            last_modified: Some(now()),
            license: None,
            default_branch: None,
        });

        let outcome = BusFactorEvaluator
            .evaluate(&snapshot, &offline_context())
            .await
            .unwrap();
        assert_eq!(outcome.breakdown.get("freshness"), Some(&1.0));
        assert!((outcome.score - 0.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_data_at_all_is_unavailable() {
        let outcome = BusFactorEvaluator
            .evaluate(&hub_snapshot(), &offline_context())
            .await
            .unwrap();
        assert_eq!(outcome.availability, Availability::Unavailable);
    }

    #[tokio::test]
    async fn test_future_activity_counts_as_fresh() {
        let mut snapshot = hub_snapshot();
        snapshot.contributors = Some(vec![contributor("alice", -30)]);

        let outcome = BusFactorEvaluator
            .evaluate(&snapshot, &offline_context())
            .await
            .unwrap();
        assert!((outcome.score - 0.1).abs() < 1e-9);
    }
}
