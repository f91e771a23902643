//! Metric evaluators
//!
//! One evaluator per [`MetricName`]. Each reads the shared snapshot, may call
//! collaborators through the [`EvaluationContext`], and returns an
//! [`Outcome`]. Evaluators never fail the evaluation: missing data becomes an
//! unavailable or degraded outcome.

use async_trait::async_trait;
use model_audit_core::{clamp_unit, Availability, MetadataSnapshot, MetricName};
use std::collections::BTreeMap;

use crate::context::EvaluationContext;
use crate::error::EvaluatorError;

pub mod bus_factor;
pub mod code_quality;
pub mod dataset_and_code;
pub mod dataset_quality;
pub mod license;
pub mod performance;
pub mod ramp_up;
pub mod reviewedness;
pub mod size;

pub use bus_factor::BusFactorEvaluator;
pub use code_quality::CodeQualityEvaluator;
pub use dataset_and_code::DatasetAndCodeEvaluator;
pub use dataset_quality::DatasetQualityEvaluator;
pub use license::LicenseEvaluator;
pub use performance::PerformanceClaimsEvaluator;
pub use ramp_up::RampUpEvaluator;
pub use reviewedness::ReviewednessEvaluator;
pub use size::SizeEvaluator;

/// What an evaluator produced, before timing is attached
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub score: f64,
    pub availability: Availability,
    pub breakdown: BTreeMap<String, f64>,
    pub note: Option<String>,
}

impl Outcome {
    /// Computed from all intended inputs
    pub fn full(score: f64) -> Self {
        Self {
            score: clamp_unit(score),
            availability: Availability::Full,
            breakdown: BTreeMap::new(),
            note: None,
        }
    }

    /// Computed from partial data or a heuristic
    pub fn degraded(score: f64, note: impl Into<String>) -> Self {
        Self {
            score: clamp_unit(score),
            availability: Availability::Degraded,
            breakdown: BTreeMap::new(),
            note: Some(note.into()),
        }
    }

    /// Nothing usable; scores 0
    pub fn unavailable(note: impl Into<String>) -> Self {
        Self {
            score: 0.0,
            availability: Availability::Unavailable,
            breakdown: BTreeMap::new(),
            note: Some(note.into()),
        }
    }

    pub fn with_component(mut self, name: impl Into<String>, value: f64) -> Self {
        self.breakdown.insert(name.into(), clamp_unit(value));
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A metric evaluator
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Which metric this evaluator produces
    fn name(&self) -> MetricName;

    /// Score the snapshot
    async fn evaluate(
        &self,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> Result<Outcome, EvaluatorError>;
}

/// The evaluator for a metric
pub fn evaluator_for(metric: MetricName) -> Box<dyn Evaluator> {
    match metric {
        MetricName::Size => Box::new(SizeEvaluator),
        MetricName::License => Box::new(LicenseEvaluator),
        MetricName::RampUpTime => Box::new(RampUpEvaluator),
        MetricName::BusFactor => Box::new(BusFactorEvaluator),
        MetricName::DatasetAndCode => Box::new(DatasetAndCodeEvaluator),
        MetricName::DatasetQuality => Box::new(DatasetQualityEvaluator),
        MetricName::CodeQuality => Box::new(CodeQualityEvaluator),
        MetricName::PerformanceClaims => Box::new(PerformanceClaimsEvaluator),
        MetricName::Reviewedness => Box::new(ReviewednessEvaluator),
    }
}

/// One evaluator per metric, in canonical order
pub fn all_evaluators() -> Vec<Box<dyn Evaluator>> {
    MetricName::ALL.iter().copied().map(evaluator_for).collect()
}

/// Section of a markdown document under a heading containing `keyword`
pub(crate) fn markdown_section<'a>(markdown: &'a str, keyword: &str) -> Option<&'a str> {
    let keyword = keyword.to_ascii_lowercase();
    let mut start: Option<(usize, usize)> = None;
    let mut offset = 0;

    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            match start {
                Some((begin, open_level)) if level <= open_level => {
                    return Some(markdown[begin..offset].trim());
                }
                None if trimmed.to_ascii_lowercase().contains(&keyword) => {
                    start = Some((offset + line.len(), level));
                }
                _ => {}
            }
        }
        offset += line.len();
    }

    start.map(|(begin, _)| markdown[begin..].trim())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use model_audit_core::{ModelReference, ReviewStats};
    use model_audit_fetch::{
        Classification, Classifier, ClassifyError, CodeSignals, FetchResult, RepositoryInsights,
        Taxonomy, UnavailableClassifier,
    };
    use std::sync::Arc;

    use crate::settings::EngineSettings;

    /// Always answers with a fixed bucket label
    pub struct FixedClassifier(pub &'static str);

    #[async_trait]
    impl Classifier for FixedClassifier {
        async fn classify(
            &self,
            _text: &str,
            taxonomy: &Taxonomy,
        ) -> Result<Classification, ClassifyError> {
            let bucket = taxonomy
                .by_label(self.0)
                .ok_or_else(|| ClassifyError::Unparsable(self.0.to_string()))?;
            Ok(Classification {
                bucket: bucket.label.clone(),
                score: bucket.score,
                confidence: 1.0,
            })
        }
    }

    /// Insights with canned answers
    #[derive(Default)]
    pub struct StubInsights {
        pub signals: Option<CodeSignals>,
        pub reviews: Option<ReviewStats>,
    }

    #[async_trait]
    impl RepositoryInsights for StubInsights {
        async fn code_signals(&self, repo: &ModelReference) -> FetchResult<CodeSignals> {
            self.signals.ok_or_else(|| not_found(repo))
        }

        async fn review_stats(&self, repo: &ModelReference) -> FetchResult<ReviewStats> {
            self.reviews.ok_or_else(|| not_found(repo))
        }
    }

    fn not_found(repo: &ModelReference) -> model_audit_fetch::FetchError {
        model_audit_fetch::FetchError::permanent(
            model_audit_fetch::PermanentKind::NotFound,
            repo.to_string(),
            "stub",
        )
    }

    pub fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    pub fn context_with(
        classifier: Arc<dyn Classifier>,
        insights: Arc<dyn RepositoryInsights>,
    ) -> EvaluationContext {
        EvaluationContext::new(classifier, insights, Arc::new(EngineSettings::default()), now())
    }

    /// Context whose collaborators are all unavailable
    pub fn offline_context() -> EvaluationContext {
        context_with(Arc::new(UnavailableClassifier), Arc::new(StubInsights::default()))
    }

    pub fn hub_snapshot() -> MetadataSnapshot {
        MetadataSnapshot::new(ModelReference::parse("https://huggingface.co/org/model").unwrap())
    }
}
