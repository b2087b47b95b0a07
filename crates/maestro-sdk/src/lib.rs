//! Maestro Strategic Mind SDK
//!
//! Ties the rule store, the knowledge base and the model store together
//! behind [`HybridInferenceEngine`], which answers CTR, ROI and channel
//! questions for a campaign context.

pub mod builder;
pub mod config;
pub mod error;
pub mod inference;
pub mod knowledge_base;

// Re-export main types
pub use builder::StrategicMindBuilder;
pub use config::{EngineConfig, InferenceConfig};
pub use error::{Result, SdkError};
pub use inference::{
    combine_predictions, ChannelRecommendation, ChannelRecommendations, EngineStatus,
    ExplanationItem, Factor, FeedbackBatch, HybridInferenceEngine, InferenceResult, Insights,
    Method, TrendPoint, CHANNEL_RULE_TYPE, CTR_RULE_TYPE, ROI_RULE_TYPE,
};
pub use knowledge_base::{DynamicKnowledgeBase, KnowledgeBaseStatus};

// Re-export commonly used types from dependencies
pub use maestro_core::{context_from_json, Context, NewRule, Rule, RuleFeedback, RuleId, RuleMatch, Value};
pub use maestro_ml::{CoercionMode, Dataset, ModelFeedback, ModelKind, ModelStore, PerformanceReport};
pub use maestro_repository::{RepositoryConfig, RulePatch, RuleRepository};
