//! Aggregation of rule answers and blending with model output

use maestro_core::{Metric, RuleMatch};

use super::types::{ExplanationItem, Factor, Insights, TrendPoint};
use crate::config::InferenceConfig;

/// Number of points in an insight trend, ending at period 0
const TREND_POINTS: i32 = 6;

/// A value aggregated from matched rules, with the rules that contributed
#[derive(Debug, Clone, PartialEq)]
pub struct RuleEstimate {
    pub value: f64,
    pub explanation: Vec<ExplanationItem>,
}

/// Weighted average of the generic `prediction` actions
///
/// Weights default to 1.0. A non-positive total weight falls back to the
/// plain mean. `None` when no match carries a prediction or the aggregate
/// overflows.
pub fn weighted_rule_prediction(matches: &[RuleMatch]) -> Option<f64> {
    let predictions: Vec<(f64, f64)> = matches
        .iter()
        .filter_map(|m| m.actions.prediction())
        .filter(|(value, weight)| value.is_finite() && weight.is_finite())
        .collect();
    if predictions.is_empty() {
        return None;
    }

    let total_weight: f64 = predictions.iter().map(|(_, w)| w).sum();
    let value = if total_weight > 0.0 {
        predictions.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight
    } else {
        predictions.iter().map(|(v, _)| v).sum::<f64>() / predictions.len() as f64
    };
    value.is_finite().then_some(value)
}

/// Rule answer for a rate metric
///
/// Direct `ctr`/`roi` values are averaged; when no rule has one, the weighted
/// generic predictions are used instead. An aggregate that is not finite
/// yields `None`.
pub fn rule_estimate(matches: &[RuleMatch], metric: Metric) -> Option<RuleEstimate> {
    let direct: Vec<(&RuleMatch, f64)> = matches
        .iter()
        .filter_map(|m| m.actions.rate(metric).map(|v| (m, v)))
        .filter(|(_, v)| v.is_finite())
        .collect();

    let (value, contributors): (f64, Vec<&RuleMatch>) = if !direct.is_empty() {
        let mean = direct.iter().map(|(_, v)| v).sum::<f64>() / direct.len() as f64;
        if !mean.is_finite() {
            tracing::warn!("Matched {} rates overflow, ignoring rule answer", metric);
            return None;
        }
        (mean, direct.into_iter().map(|(m, _)| m).collect())
    } else {
        let value = weighted_rule_prediction(matches)?;
        let contributors = matches.iter().filter(|m| m.actions.prediction().is_some()).collect();
        (value, contributors)
    };

    let importance = 1.0 / contributors.len() as f64;
    let explanation = contributors
        .into_iter()
        .map(|m| {
            ExplanationItem::new(
                "knowledge_rules",
                m.rule_name.clone(),
                importance,
                m.actions.explanation().unwrap_or("Rule-based factor"),
            )
        })
        .collect();

    Some(RuleEstimate { value, explanation })
}

/// Blend rule matches with an optional model value
///
/// Both present: `model_weight · model + rule_weight · rules`. Only one:
/// that one. Neither: `None`.
pub fn combine_predictions(
    rule_matches: &[RuleMatch],
    model_prediction: Option<f64>,
    config: &InferenceConfig,
) -> Option<f64> {
    match (weighted_rule_prediction(rule_matches), model_prediction) {
        (Some(rules), Some(model)) => Some(blend(rules, model, config)),
        (Some(rules), None) => Some(rules),
        (None, model) => model,
    }
}

pub(crate) fn blend(rules: f64, model: f64, config: &InferenceConfig) -> f64 {
    config.model_weight * model + config.rule_weight * rules
}

/// Factors, trend and benchmark for a rate prediction
///
/// The trend ramps linearly from the benchmark five periods ago to the
/// prediction now.
pub fn insights(prediction: f64, benchmark: f64, explanation: &[ExplanationItem]) -> Insights {
    let steps = (TREND_POINTS - 1) as f64;
    let trend = (0..TREND_POINTS)
        .map(|i| TrendPoint {
            period: i - (TREND_POINTS - 1),
            value: benchmark + (prediction - benchmark) * i as f64 / steps,
        })
        .collect();
    Insights {
        factors: explanation
            .iter()
            .map(|item| Factor {
                name: item.factor.clone(),
                value: item.importance,
            })
            .collect(),
        trend,
        benchmark,
    }
}
