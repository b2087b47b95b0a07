//! Hybrid inference engine
//!
//! Each prediction walks a fixed chain of tiers and stops at the first that
//! answers:
//!
//! 1. knowledge rules of the matching type
//! 2. the trained model of the matching kind
//! 3. deterministic heuristics
//!
//! A model that is missing or lacks features hands over to the next tier. Any
//! other failure short-circuits to a fixed fallback answer carrying the error
//! text, so every call returns a result.

use maestro_core::{Context, Metric, RuleMatch, Value};
use maestro_ml::{ModelError, ModelKind, ModelResult, ModelStore, PerformanceReport};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::combine::{self, RuleEstimate};
use super::heuristics::{self, HeuristicEstimate, CHANNEL_CATALOG};
use super::types::{
    ChannelRecommendation, ChannelRecommendations, ExplanationItem, FeedbackBatch,
    InferenceResult, Method,
};
use crate::config::InferenceConfig;
use crate::knowledge_base::{DynamicKnowledgeBase, KnowledgeBaseStatus};

pub const CTR_RULE_TYPE: &str = "ctr_prediction";
pub const ROI_RULE_TYPE: &str = "roi_prediction";
pub const CHANNEL_RULE_TYPE: &str = "channel_recommendation";

/// Combined view of the knowledge base and the model store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub knowledge_base: KnowledgeBaseStatus,
    pub models: PerformanceReport,
}

#[derive(Debug, Clone, Copy)]
enum RateTarget {
    Ctr,
    Roi,
}

impl RateTarget {
    fn metric(self) -> Metric {
        match self {
            RateTarget::Ctr => Metric::Ctr,
            RateTarget::Roi => Metric::Roi,
        }
    }

    fn model(self) -> ModelKind {
        match self {
            RateTarget::Ctr => ModelKind::Ctr,
            RateTarget::Roi => ModelKind::Roi,
        }
    }

    fn rule_type(self) -> &'static str {
        match self {
            RateTarget::Ctr => CTR_RULE_TYPE,
            RateTarget::Roi => ROI_RULE_TYPE,
        }
    }

    /// CTR is a rate in [0, 1]; ROI only has a floor
    fn bound(self, value: f64) -> f64 {
        match self {
            RateTarget::Ctr => value.clamp(0.0, 1.0),
            RateTarget::Roi => value.max(0.0),
        }
    }
}

/// Answer of one tier before bounding and insights
struct TierAnswer {
    value: f64,
    confidence: f64,
    method: Method,
    explanation: Vec<ExplanationItem>,
}

/// Rules first, then models, then heuristics
pub struct HybridInferenceEngine {
    knowledge_base: Arc<DynamicKnowledgeBase>,
    models: Arc<ModelStore>,
    config: InferenceConfig,
}

impl HybridInferenceEngine {
    pub fn new(
        knowledge_base: Arc<DynamicKnowledgeBase>,
        models: Arc<ModelStore>,
        config: InferenceConfig,
    ) -> Self {
        Self {
            knowledge_base,
            models,
            config,
        }
    }

    pub fn knowledge_base(&self) -> &Arc<DynamicKnowledgeBase> {
        &self.knowledge_base
    }

    pub fn model_store(&self) -> &Arc<ModelStore> {
        &self.models
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Predict click-through rate; always within [0, 1]
    pub async fn predict_ctr(&self, context: &Context) -> InferenceResult {
        self.predict_rate(RateTarget::Ctr, context).await
    }

    /// Predict return on investment; never negative
    pub async fn predict_roi(&self, context: &Context) -> InferenceResult {
        self.predict_rate(RateTarget::Roi, context).await
    }

    async fn predict_rate(&self, target: RateTarget, context: &Context) -> InferenceResult {
        let answer = match self.resolve_rate(target, context).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("{} prediction failed, using fallback: {}", target.metric(), e);
                TierAnswer {
                    value: match target {
                        RateTarget::Ctr => self.config.fallback_ctr,
                        RateTarget::Roi => self.config.fallback_roi,
                    },
                    confidence: self.config.fallback_confidence,
                    method: Method::Fallback,
                    explanation: vec![ExplanationItem::new("fallback", "error", 1.0, e.to_string())],
                }
            }
        };

        let prediction = target.bound(answer.value);
        let benchmark = match target {
            RateTarget::Ctr => self.config.ctr_benchmark,
            RateTarget::Roi => self.config.roi_benchmark,
        };
        tracing::debug!(
            "{} prediction {} via {} (confidence {})",
            target.metric(),
            prediction,
            answer.method,
            answer.confidence
        );

        InferenceResult {
            prediction,
            confidence: answer.confidence,
            method: answer.method,
            insights: Some(combine::insights(prediction, benchmark, &answer.explanation)),
            explanation: answer.explanation,
        }
    }

    async fn resolve_rate(&self, target: RateTarget, context: &Context) -> ModelResult<TierAnswer> {
        let matches = self
            .knowledge_base
            .evaluate(context, Some(target.rule_type()))
            .await;
        let rules = combine::rule_estimate(&matches, target.metric());

        if let Some(rules) = &rules {
            if !self.config.blend_rules_with_model {
                return Ok(self.rule_answer(rules.clone()));
            }
        }

        match self.models.predict(target.model(), context).await {
            Ok(model) => {
                let model_confidence = self.model_confidence(target.model()).await;
                let model_item = ExplanationItem::new(
                    "ml_model",
                    "model_prediction",
                    0.8,
                    format!("{} predicted {:.4}", model.model_used, model.prediction),
                );
                Ok(match rules {
                    Some(rules) => {
                        let mut explanation = rules.explanation;
                        explanation.push(model_item);
                        TierAnswer {
                            value: combine::blend(rules.value, model.prediction, &self.config),
                            confidence: (self.config.rule_confidence + model_confidence) / 2.0,
                            method: Method::Hybrid,
                            explanation,
                        }
                    }
                    None => TierAnswer {
                        value: model.prediction,
                        confidence: model_confidence,
                        method: Method::MlModel,
                        explanation: vec![model_item],
                    },
                })
            }
            Err(e) if e.is_not_applicable() => {
                tracing::debug!("{} model not applicable: {}", target.metric(), e);
                Ok(match rules {
                    Some(rules) => self.rule_answer(rules),
                    None => {
                        let estimate = match target {
                            RateTarget::Ctr => heuristics::estimate_ctr(context, self.config.base_ctr),
                            RateTarget::Roi => heuristics::estimate_roi(context, self.config.base_roi),
                        };
                        self.heuristic_answer(estimate)
                    }
                })
            }
            Err(e) => Err(e),
        }
    }

    fn rule_answer(&self, rules: RuleEstimate) -> TierAnswer {
        TierAnswer {
            value: rules.value,
            confidence: self.config.rule_confidence,
            method: Method::KnowledgeRules,
            explanation: rules.explanation,
        }
    }

    fn heuristic_answer(&self, estimate: HeuristicEstimate) -> TierAnswer {
        TierAnswer {
            value: estimate.value,
            confidence: self.config.heuristic_confidence,
            method: Method::Heuristic,
            explanation: estimate.explanation,
        }
    }

    async fn model_confidence(&self, kind: ModelKind) -> f64 {
        self.models
            .metrics(kind)
            .await
            .map(|m| m.confidence())
            .unwrap_or(self.config.default_model_confidence)
    }

    /// Rank channels for a campaign, highest score first
    pub async fn recommend_channels(&self, context: &Context) -> ChannelRecommendations {
        let (recommendations, method, confidence) = match self.resolve_channels(context).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Channel recommendation failed, using fallback: {}", e);
                (
                    heuristics::fallback_channels(),
                    Method::Fallback,
                    self.config.fallback_confidence,
                )
            }
        };

        let mut ranked: Vec<ChannelRecommendation> = Vec::with_capacity(recommendations.len());
        for rec in recommendations {
            match ranked.iter_mut().find(|r| r.channel == rec.channel) {
                Some(existing) if rec.score > existing.score => *existing = rec,
                Some(_) => {}
                None => ranked.push(rec),
            }
        }
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(self.config.max_channel_recommendations);

        ChannelRecommendations {
            recommendations: ranked,
            method,
            confidence,
        }
    }

    async fn resolve_channels(
        &self,
        context: &Context,
    ) -> ModelResult<(Vec<ChannelRecommendation>, Method, f64)> {
        let matches = self
            .knowledge_base
            .evaluate(context, Some(CHANNEL_RULE_TYPE))
            .await;
        let from_rules = rule_channels(&matches);
        if !from_rules.is_empty() {
            return Ok((from_rules, Method::KnowledgeRules, self.config.rule_confidence));
        }

        match self.model_channels(context).await {
            Ok(scored) => {
                let confidence = self.model_confidence(ModelKind::Channel).await;
                Ok((scored, Method::MlModel, confidence))
            }
            Err(e) if e.is_not_applicable() => {
                tracing::debug!("Channel model not applicable: {}", e);
                Ok((
                    heuristics::recommend_channels(context),
                    Method::Heuristic,
                    self.config.heuristic_confidence,
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Score every catalog channel with one-hot `channel_is_<name>` features
    async fn model_channels(&self, context: &Context) -> ModelResult<Vec<ChannelRecommendation>> {
        if !self.models.is_loaded(ModelKind::Channel).await {
            return Err(ModelError::ModelUnavailable(ModelKind::Channel));
        }

        let mut scored = Vec::with_capacity(CHANNEL_CATALOG.len());
        for candidate in CHANNEL_CATALOG.iter() {
            let mut features = context.clone();
            for profile in CHANNEL_CATALOG.iter() {
                let flag = if profile.name == candidate.name { 1.0 } else { 0.0 };
                features.insert(format!("channel_is_{}", profile.name), Value::Number(flag));
            }
            let prediction = self.models.predict(ModelKind::Channel, &features).await?;
            scored.push(ChannelRecommendation::new(
                candidate.name,
                prediction.prediction,
                format!("ML model prediction with {:.2} confidence", prediction.prediction),
            ));
        }
        Ok(scored)
    }

    /// Legacy blend of rule predictions with a model value
    pub fn combine_predictions(
        &self,
        rule_matches: &[RuleMatch],
        model_prediction: Option<f64>,
    ) -> Option<f64> {
        combine::combine_predictions(rule_matches, model_prediction, &self.config)
    }

    /// Route rule feedback to the knowledge base and outcomes to the model store
    ///
    /// Every item is attempted. Returns false if any storage error occurred.
    /// Feedback for unknown rules is skipped without failing the batch.
    pub async fn update_from_feedback(&self, batch: &FeedbackBatch) -> bool {
        let mut ok = true;
        for feedback in &batch.rule_feedback {
            match self
                .knowledge_base
                .try_update_from_feedback(feedback.rule_id, feedback)
                .await
            {
                Ok(true) => {}
                Ok(false) => tracing::debug!("Skipped feedback for rule {}", feedback.rule_id),
                Err(e) => {
                    tracing::error!("Error applying feedback to rule {}: {}", feedback.rule_id, e);
                    ok = false;
                }
            }
        }
        for feedback in &batch.ml_feedback {
            self.models.record_feedback(feedback).await;
        }
        tracing::info!(
            "Processed {} rule and {} model feedback item(s)",
            batch.rule_feedback.len(),
            batch.ml_feedback.len()
        );
        ok
    }

    pub async fn status(&self) -> EngineStatus {
        EngineStatus {
            knowledge_base: self.knowledge_base.status().await,
            models: self.models.performance_report().await,
        }
    }
}

/// Channels named by matched rules; score defaults to 0.5
fn rule_channels(matches: &[RuleMatch]) -> Vec<ChannelRecommendation> {
    let mut out = Vec::new();
    for m in matches {
        if let Some((channels, score, reason)) = m.actions.channels() {
            let score = score.filter(|s| s.is_finite()).unwrap_or(0.5).clamp(0.0, 1.0);
            let reason = reason
                .map(str::to_string)
                .unwrap_or_else(|| format!("Based on rule: {}", m.rule_name));
            out.extend(
                channels
                    .iter()
                    .map(|channel| ChannelRecommendation::new(channel.clone(), score, reason.clone())),
            );
        }
    }
    out
}
