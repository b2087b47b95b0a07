//! Predictive models for the Maestro Strategic Mind
//!
//! Three models are managed, one per [`ModelKind`]: CTR, ROI and channel
//! score. Each is a tree ensemble trained in-process and persisted as JSON:
//!
//! - CTR: [`RandomForest`] (100 bagged trees, max depth 10, seed 42)
//! - ROI and channel: [`GradientBoosting`] (100 stages, learning rate 0.1, max depth 5)
//!
//! [`ModelStore`] owns the loaded models. It never calls an estimator with an
//! incomplete feature vector: missing or uncoercible features surface as
//! [`ModelError::InsufficientFeatures`].

pub mod dataset;
pub mod ensemble;
pub mod error;
pub mod estimator;
pub mod features;
pub mod kind;
pub mod metrics;
pub mod store;
pub mod tree;

pub use dataset::{Dataset, TrainingSet};
pub use ensemble::{BoostingParams, ForestParams, GradientBoosting, RandomForest};
pub use error::{ModelError, ModelResult};
pub use estimator::{Estimator, Regressor};
pub use features::{coerce, prepare_features, CoercionMode};
pub use kind::ModelKind;
pub use metrics::{FeedbackStats, ModelFeedback, ModelMetrics};
pub use store::{ModelPrediction, ModelStore, PerformanceReport};
pub use tree::{RegressionTree, TreeParams};
