//! Size: how comfortably the model's weights fit on each device class

use async_trait::async_trait;
use model_audit_core::{MetadataSnapshot, MetricName};
use tracing::debug;

use super::{Evaluator, Outcome};
use crate::context::EvaluationContext;
use crate::error::EvaluatorError;
use crate::settings::SizeSettings;

pub struct SizeEvaluator;

/// Smoothstep falloff: 1 below `floor` x budget, 0 above `ceiling` x budget
pub fn device_score(total_bytes: u64, budget_bytes: u64, floor: f64, ceiling: f64) -> f64 {
    if budget_bytes == 0 {
        return 0.0;
    }
    let ratio = total_bytes as f64 / budget_bytes as f64;
    let span = (ceiling - floor).max(f64::EPSILON);
    let t = ((ratio - floor) / span).clamp(0.0, 1.0);
    1.0 - t * t * (3.0 - 2.0 * t)
}

/// Total bytes of files whose extension marks them as weights
pub fn weight_bytes(snapshot: &MetadataSnapshot, settings: &SizeSettings) -> Option<u64> {
    let files = snapshot.files.as_ref()?;
    Some(
        files
            .iter()
            .filter(|f| {
                f.extension().is_some_and(|ext| {
                    settings
                        .weight_extensions
                        .iter()
                        .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
                })
            })
            .map(|f| f.size_bytes)
            .sum(),
    )
}

#[async_trait]
impl Evaluator for SizeEvaluator {
    fn name(&self) -> MetricName {
        MetricName::Size
    }

    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError> {
        let settings = &ctx.settings.size;
        let total = weight_bytes(snapshot, settings)
            .ok_or_else(|| EvaluatorError::MissingData("file inventory".to_string()))?;

        if settings.devices.is_empty() {
            return Ok(Outcome::unavailable("no device classes configured"));
        }

        let mut outcome = Outcome::full(0.0);
        let mut sum = 0.0;
        for device in &settings.devices {
            let score = device_score(total, device.bytes, settings.ratio_floor, settings.ratio_ceiling);
            sum += score;
            outcome = outcome.with_component(device.name.clone(), score);
        }
        outcome.score = sum / settings.devices.len() as f64;

        if total == 0 {
            outcome = outcome.with_note("no weight files found");
        }

        debug!(total_bytes = total, score = outcome.score, "Size evaluated");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_support::{hub_snapshot, offline_context};
    use model_audit_core::{Availability, RepoFile};

    #[test]
    fn test_device_score_curve() {
        let budget = 1_000;
        assert_eq!(device_score(0, budget, 0.25, 1.5), 1.0);
        assert_eq!(device_score(250, budget, 0.25, 1.5), 1.0);
        assert_eq!(device_score(1_500, budget, 0.25, 1.5), 0.0);
        assert_eq!(device_score(10_000, budget, 0.25, 1.5), 0.0);
        let mid = device_score(875, budget, 0.25, 1.5);
        assert!((mid - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_weight_set_scores_one() {
        let mut snapshot = hub_snapshot();
        snapshot.files = Some(vec![RepoFile::new("README.md", 4_000)]);

        let outcome = SizeEvaluator.evaluate(&snapshot, &offline_context()).await.unwrap();
        assert_eq!(outcome.score, 1.0);
        assert_eq!(outcome.availability, Availability::Full);
        assert_eq!(outcome.breakdown.len(), 4);
    }

    #[tokio::test]
    async fn test_large_model_penalized_on_small_devices() {
        let mut snapshot = hub_snapshot();
        snapshot.files = Some(vec![
            RepoFile::new("model-00001.safetensors", 2_000_000_000),
            RepoFile::new("model-00002.safetensors", 2_000_000_000),
            RepoFile::new("tokenizer.json", 2_000_000),
        ]);

        let outcome = SizeEvaluator.evaluate(&snapshot, &offline_context()).await.unwrap();
        assert_eq!(outcome.breakdown["raspberry_pi"], 0.0);
        assert_eq!(outcome.breakdown["jetson_nano"], 0.0);
        assert!(outcome.breakdown["desktop_pc"] > 0.0);
        assert!(outcome.breakdown["aws_server"] > outcome.breakdown["desktop_pc"]);
        let mean: f64 = outcome.breakdown.values().sum::<f64>() / 4.0;
        assert!((outcome.score - mean).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_inventory_is_an_error() {
        let result = SizeEvaluator.evaluate(&hub_snapshot(), &offline_context()).await;
        assert!(matches!(result, Err(EvaluatorError::MissingData(_))));
    }
}
