//! Evaluation engine
//!
//! Runs one fetch per evaluation, fans the snapshot out to every metric
//! evaluator concurrently, and aggregates the results into a [`ScoreCard`].
//! Each evaluator is bounded by its own timeout and isolated from panics, so
//! the only way an evaluation fails is a fetch-level error.

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use model_audit_core::{
    EvaluationId, EvaluationRequest, MetadataSnapshot, MetricResult, ModelReference, ScoreCard,
};
use model_audit_fetch::{
    Classifier, MetadataFetcher, RepositoryInsights, UnavailableClassifier, UnavailableInsights,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::aggregate::Aggregator;
use crate::context::{Clock, EvaluationContext, SystemClock};
use crate::error::{EvaluationError, EvaluationResult, EvaluatorError};
use crate::gate::{Admission, DecisionGate};
use crate::metrics::{all_evaluators, Evaluator, Outcome};
use crate::settings::EngineSettings;

/// Trait for evaluation operations
#[async_trait]
pub trait EvaluationService: Send + Sync {
    /// Evaluate a single model reference
    async fn evaluate(&self, reference: &ModelReference) -> EvaluationResult<ScoreCard>;

    /// Evaluate a model with explicitly linked code and dataset
    async fn evaluate_request(&self, request: &EvaluationRequest) -> EvaluationResult<ScoreCard>;

    /// Decide whether a finished card is admissible for registration
    fn is_admissible(&self, card: &ScoreCard) -> Admission;
}

/// Default implementation of [`EvaluationService`]
pub struct EvaluationEngine {
    fetcher: Arc<dyn MetadataFetcher>,
    classifier: Arc<dyn Classifier>,
    insights: Arc<dyn RepositoryInsights>,
    clock: Arc<dyn Clock>,
    settings: Arc<EngineSettings>,
    evaluators: Vec<Box<dyn Evaluator>>,
    aggregator: Aggregator,
    gate: DecisionGate,
}

/// Builder for [`EvaluationEngine`]
pub struct EngineBuilder {
    fetcher: Arc<dyn MetadataFetcher>,
    classifier: Arc<dyn Classifier>,
    insights: Arc<dyn RepositoryInsights>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl EngineBuilder {
    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn insights(mut self, insights: Arc<dyn RepositoryInsights>) -> Self {
        self.insights = insights;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Validate the weight table and build the engine
    pub fn build(self) -> EvaluationResult<EvaluationEngine> {
        let aggregator = Aggregator::from_settings(&self.settings)?;
        let gate = DecisionGate::new(self.settings.admission_threshold);
        Ok(EvaluationEngine {
            fetcher: self.fetcher,
            classifier: self.classifier,
            insights: self.insights,
            clock: self.clock,
            settings: Arc::new(self.settings),
            evaluators: all_evaluators(),
            aggregator,
            gate,
        })
    }
}

impl EvaluationEngine {
    /// Start building an engine around a fetcher; every other collaborator
    /// defaults to an unavailable stub
    pub fn builder(fetcher: Arc<dyn MetadataFetcher>) -> EngineBuilder {
        EngineBuilder {
            fetcher,
            classifier: Arc::new(UnavailableClassifier),
            insights: Arc::new(UnavailableInsights),
            clock: Arc::new(SystemClock),
            settings: EngineSettings::default(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Parse a URL and evaluate it
    pub async fn evaluate_url(&self, url: &str) -> EvaluationResult<ScoreCard> {
        let reference = ModelReference::parse(url)?;
        self.evaluate(&reference).await
    }

    /// Score an already fetched snapshot
    ///
    /// Deterministic for a frozen snapshot when the collaborators and clock are.
    pub async fn evaluate_snapshot(&self, snapshot: &MetadataSnapshot) -> ScoreCard {
        let started = Instant::now();
        self.score(snapshot, started).await
    }

    async fn score(&self, snapshot: &MetadataSnapshot, started: Instant) -> ScoreCard {
        let ctx = EvaluationContext::new(
            self.classifier.clone(),
            self.insights.clone(),
            self.settings.clone(),
            self.clock.now(),
        );

        let results = join_all(
            self.evaluators
                .iter()
                .map(|evaluator| self.run_evaluator(evaluator.as_ref(), snapshot, &ctx)),
        )
        .await;

        self.aggregator
            .aggregate(results, started.elapsed(), self.clock.now())
    }

    /// Run one evaluator under its time budget; errors, timeouts and panics
    /// become an unavailable result
    async fn run_evaluator(
        &self,
        evaluator: &dyn Evaluator,
        snapshot: &MetadataSnapshot,
        ctx: &EvaluationContext,
    ) -> MetricResult {
        let metric = evaluator.name();
        let budget = self.settings.evaluator_timeout();
        let started = Instant::now();

        let guarded = AssertUnwindSafe(evaluator.evaluate(snapshot, ctx)).catch_unwind();
        let outcome = match tokio::time::timeout(budget, guarded)
            .instrument(info_span!("metric", metric = %metric))
            .await
        {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(err))) => {
                warn!(metric = %metric, error = %err, "Evaluator failed");
                Outcome::unavailable(err.to_string())
            }
            Ok(Err(_)) => {
                error!(metric = %metric, "Evaluator panicked");
                Outcome::unavailable("evaluator panicked")
            }
            Err(_) => {
                let err = EvaluatorError::Timeout(budget.as_millis() as u64);
                warn!(metric = %metric, error = %err, "Evaluator timed out");
                Outcome::unavailable(err.to_string())
            }
        };

        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(
            metric = %metric,
            score = outcome.score,
            availability = %outcome.availability,
            latency_ms,
            "Metric computed"
        );

        let mut result = MetricResult::new(metric, outcome.score, latency_ms, outcome.availability)
            .with_breakdown(outcome.breakdown);
        if let Some(note) = outcome.note {
            result = result.with_note(note);
        }
        result
    }
}

#[async_trait]
impl EvaluationService for EvaluationEngine {
    async fn evaluate(&self, reference: &ModelReference) -> EvaluationResult<ScoreCard> {
        self.evaluate_request(&EvaluationRequest::new(reference.clone()))
            .await
    }

    async fn evaluate_request(&self, request: &EvaluationRequest) -> EvaluationResult<ScoreCard> {
        request.validate()?;

        let evaluation_id = EvaluationId::new();
        let span = info_span!("evaluation", %evaluation_id, url = %request.model);

        async {
            let started = Instant::now();
            let snapshot = self.fetcher.fetch(request).await.map_err(|err| {
                warn!(error = %err, "Metadata fetch failed");
                EvaluationError::from(err)
            })?;

            let missing = snapshot.missing_fields();
            if !missing.is_empty() {
                debug!(?missing, "Snapshot is incomplete");
            }

            let card = self.score(&snapshot, started).await;
            info!(
                net_score = card.net_score,
                latency_ms = card.net_score_latency_ms,
                "Evaluation complete"
            );
            Ok::<_, EvaluationError>(card)
        }
        .instrument(span)
        .await
    }

    fn is_admissible(&self, card: &ScoreCard) -> Admission {
        self.gate.decide(card)
    }
}
