//! Core domain models and types for model auditing
//!
//! This crate contains the data structures shared by the fetch layer, the
//! metric evaluators, and the aggregation engine: model references, metadata
//! snapshots, metric results, score cards, and the net-score weight table.

pub mod error;
pub mod metric;
pub mod reference;
pub mod scorecard;
pub mod snapshot;
pub mod types;
pub mod weights;

// Re-exports for convenience
pub use error::{AggregationConfigError, ReferenceError};
pub use metric::{clamp_unit, Availability, MetricName, MetricResult};
pub use reference::{EvaluationRequest, HostKind, ModelReference};
pub use scorecard::ScoreCard;
pub use snapshot::{
    CodeRepository, Contributor, DatasetRecord, MetadataSnapshot, Popularity, RepoFile,
    ReviewStats, SnapshotField,
};
pub use types::EvaluationId;
pub use weights::WeightTable;
