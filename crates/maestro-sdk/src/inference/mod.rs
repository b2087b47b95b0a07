//! Hybrid rule / model / heuristic inference

pub mod combine;
mod engine;
pub mod heuristics;
pub mod types;

pub use combine::{combine_predictions, weighted_rule_prediction};
pub use engine::{
    EngineStatus, HybridInferenceEngine, CHANNEL_RULE_TYPE, CTR_RULE_TYPE, ROI_RULE_TYPE,
};
pub use types::{
    ChannelRecommendation, ChannelRecommendations, ExplanationItem, Factor, FeedbackBatch,
    InferenceResult, Insights, Method, TrendPoint,
};
