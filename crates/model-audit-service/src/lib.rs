//! Evaluation engine for model auditing
//!
//! This crate turns a model reference into a [`ScoreCard`](model_audit_core::ScoreCard)
//! and an admission decision.
//!
//! # Architecture
//!
//! - **EvaluationEngine**: fetch once, run every evaluator concurrently, aggregate
//! - **Evaluators**: one per metric, behind the [`Evaluator`] trait
//! - **Aggregator**: weighted net score over a validated weight table
//! - **DecisionGate**: per-metric admission threshold
//!
//! # Example
//!
//! ```rust,no_run
//! use model_audit_service::{EngineSettings, EvaluationEngine, EvaluationService};
//! use model_audit_fetch::{MetadataFetcher, Classifier, RepositoryInsights};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     fetcher: Arc<dyn MetadataFetcher>,
//! #     classifier: Arc<dyn Classifier>,
//! #     insights: Arc<dyn RepositoryInsights>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = EvaluationEngine::builder(fetcher)
//!     .classifier(classifier)
//!     .insights(insights)
//!     .settings(EngineSettings::default())
//!     .build()?;
//!
//! let card = engine
//!     .evaluate_url("https://huggingface.co/google-bert/bert-base-uncased")
//!     .await?;
//! let admission = engine.is_admissible(&card);
//! println!("net score {:.2}, accepted: {}", card.net_score, admission.accepted);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod context;
pub mod engine;
pub mod error;
pub mod gate;
pub mod metrics;
pub mod settings;

// Re-export main types for convenience
pub use aggregate::Aggregator;
pub use context::{Clock, EvaluationContext, FixedClock, SystemClock};
pub use engine::{EngineBuilder, EvaluationEngine, EvaluationService};
pub use error::{EvaluationError, EvaluationResult, EvaluatorError};
pub use gate::{Admission, DecisionGate};
pub use metrics::{all_evaluators, evaluator_for, Evaluator, Outcome};
pub use settings::{DeviceBudget, EngineSettings, RampUpSettings, SizeSettings};
