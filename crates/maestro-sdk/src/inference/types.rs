//! Inference result types

use serde::{Deserialize, Serialize};
use std::fmt;

use maestro_core::RuleFeedback;
use maestro_ml::ModelFeedback;

/// Which tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    KnowledgeRules,
    MlModel,
    Hybrid,
    Heuristic,
    Fallback,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::KnowledgeRules => "knowledge_rules",
            Method::MlModel => "ml_model",
            Method::Hybrid => "hybrid",
            Method::Heuristic => "heuristic",
            Method::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationItem {
    pub source: String,
    pub factor: String,
    pub importance: f64,
    pub description: String,
}

impl ExplanationItem {
    pub fn new(
        source: impl Into<String>,
        factor: impl Into<String>,
        importance: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            factor: factor.into(),
            importance,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub value: f64,
}

/// A point of the recent-history series; `period` counts back from 0 (now)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: i32,
    pub value: f64,
}

/// Presentation data attached to rate predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insights {
    pub factors: Vec<Factor>,
    pub trend: Vec<TrendPoint>,
    pub benchmark: f64,
}

/// A CTR or ROI prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub prediction: f64,
    pub confidence: f64,
    pub method: Method,
    pub explanation: Vec<ExplanationItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecommendation {
    pub channel: String,
    pub score: f64,
    pub reason: String,
}

impl ChannelRecommendation {
    pub fn new(channel: impl Into<String>, score: f64, reason: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            score,
            reason: reason.into(),
        }
    }
}

/// Ranked channels, highest score first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRecommendations {
    pub recommendations: Vec<ChannelRecommendation>,
    pub method: Method,
    pub confidence: f64,
}

/// Feedback routed by the inference engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackBatch {
    #[serde(default)]
    pub rule_feedback: Vec<RuleFeedback>,
    #[serde(default)]
    pub ml_feedback: Vec<ModelFeedback>,
}

impl FeedbackBatch {
    pub fn is_empty(&self) -> bool {
        self.rule_feedback.is_empty() && self.ml_feedback.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_wire_names() {
        assert_eq!(serde_json::to_value(Method::KnowledgeRules).unwrap(), json!("knowledge_rules"));
        assert_eq!(serde_json::to_value(Method::MlModel).unwrap(), json!("ml_model"));
        let method: Method = serde_json::from_value(json!("heuristic")).unwrap();
        assert_eq!(method, Method::Heuristic);
        assert_eq!(Method::Fallback.to_string(), "fallback");
    }

    #[test]
    fn test_feedback_batch_defaults() {
        let batch: FeedbackBatch = serde_json::from_value(json!({
            "rule_feedback": [{"rule_id": 1, "is_useful": true}]
        }))
        .unwrap();
        assert_eq!(batch.rule_feedback.len(), 1);
        assert!(batch.ml_feedback.is_empty());
        assert!(!batch.is_empty());
        assert!(FeedbackBatch::default().is_empty());
    }

    #[test]
    fn test_insights_omitted_when_absent() {
        let result = InferenceResult {
            prediction: 0.1,
            confidence: 0.6,
            method: Method::Heuristic,
            explanation: vec![],
            insights: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("insights").is_none());
    }
}
