//! Rule action payloads
//!
//! Stored actions are open-ended JSON objects. The keys the inference engine
//! understands are lifted into [`RuleAction`] variants; everything else is
//! carried along untouched in `extra` so nothing is lost on write-back.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map};
use std::fmt;

/// Rate metric a rule can predict directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Click-through rate
    Ctr,
    /// Return on investment
    Roi,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Ctr => "ctr",
            Metric::Roi => "roi",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed element of a rule's action payload
#[derive(Debug, Clone, PartialEq)]
pub enum RuleAction {
    /// `{"prediction": v}`
    Prediction(f64),
    /// `{"prediction": v, "weight": w}`
    WeightedPrediction { value: f64, weight: f64 },
    /// `{"ctr": v}` or `{"roi": v}`
    Rate { metric: Metric, value: f64 },
    /// `{"recommended_channels": [...], "score": s, "reason": r}`
    ChannelList {
        channels: Vec<String>,
        score: Option<f64>,
        reason: Option<String>,
    },
    /// `{"explanation": "..."}`
    Explanation(String),
}

/// Parsed action payload of a rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleActions {
    pub items: Vec<RuleAction>,
    /// Keys with no typed meaning (or ill-typed values), kept verbatim
    pub extra: Map<String, serde_json::Value>,
}

impl RuleActions {
    pub fn new(items: Vec<RuleAction>) -> Self {
        Self {
            items,
            extra: Map::new(),
        }
    }

    /// Parse a stored action object
    ///
    /// Never fails. A non-object payload yields empty actions.
    pub fn from_json(json: &serde_json::Value) -> Self {
        let obj = match json.as_object() {
            Some(obj) => obj,
            None => {
                if !json.is_null() {
                    log::warn!("Rule actions must be a JSON object, got {}", json);
                }
                return Self::default();
            }
        };

        let mut extra = obj.clone();
        let mut items = Vec::new();

        if let Some(value) = obj.get("prediction").and_then(|v| v.as_f64()) {
            extra.remove("prediction");
            match obj.get("weight").and_then(|w| w.as_f64()) {
                Some(weight) => {
                    extra.remove("weight");
                    items.push(RuleAction::WeightedPrediction { value, weight });
                }
                None => items.push(RuleAction::Prediction(value)),
            }
        }

        for metric in [Metric::Ctr, Metric::Roi] {
            if let Some(value) = obj.get(metric.as_str()).and_then(|v| v.as_f64()) {
                extra.remove(metric.as_str());
                items.push(RuleAction::Rate { metric, value });
            }
        }

        if let Some(channels) = obj.get("recommended_channels").and_then(string_list) {
            extra.remove("recommended_channels");
            let score = obj.get("score").and_then(|v| v.as_f64());
            if score.is_some() {
                extra.remove("score");
            }
            let reason = obj.get("reason").and_then(|v| v.as_str()).map(str::to_string);
            if reason.is_some() {
                extra.remove("reason");
            }
            items.push(RuleAction::ChannelList {
                channels,
                score,
                reason,
            });
        }

        if let Some(text) = obj.get("explanation").and_then(|v| v.as_str()) {
            extra.remove("explanation");
            items.push(RuleAction::Explanation(text.to_string()));
        }

        Self { items, extra }
    }

    /// Parse actions stored as JSON text (legacy text columns)
    pub fn from_json_str(text: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json) => Self::from_json(&json),
            Err(e) => {
                log::warn!("Rule actions are not valid JSON: {}", e);
                Self::default()
            }
        }
    }

    /// Render the stored object form
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = self.extra.clone();
        for item in &self.items {
            match item {
                RuleAction::Prediction(value) => {
                    map.insert("prediction".to_string(), json!(value));
                }
                RuleAction::WeightedPrediction { value, weight } => {
                    map.insert("prediction".to_string(), json!(value));
                    map.insert("weight".to_string(), json!(weight));
                }
                RuleAction::Rate { metric, value } => {
                    map.insert(metric.as_str().to_string(), json!(value));
                }
                RuleAction::ChannelList {
                    channels,
                    score,
                    reason,
                } => {
                    map.insert("recommended_channels".to_string(), json!(channels));
                    if let Some(score) = score {
                        map.insert("score".to_string(), json!(score));
                    }
                    if let Some(reason) = reason {
                        map.insert("reason".to_string(), json!(reason));
                    }
                }
                RuleAction::Explanation(text) => {
                    map.insert("explanation".to_string(), json!(text));
                }
            }
        }
        serde_json::Value::Object(map)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.extra.is_empty()
    }

    /// Direct rate value for `metric`, if the rule declares one
    pub fn rate(&self, metric: Metric) -> Option<f64> {
        self.items.iter().find_map(|item| match item {
            RuleAction::Rate { metric: m, value } if *m == metric => Some(*value),
            _ => None,
        })
    }

    /// Generic `(prediction, weight)`; weight defaults to 1.0
    pub fn prediction(&self) -> Option<(f64, f64)> {
        self.items.iter().find_map(|item| match item {
            RuleAction::Prediction(value) => Some((*value, 1.0)),
            RuleAction::WeightedPrediction { value, weight } => Some((*value, *weight)),
            _ => None,
        })
    }

    /// Recommended channels with their optional score and reason
    pub fn channels(&self) -> Option<(&[String], Option<f64>, Option<&str>)> {
        self.items.iter().find_map(|item| match item {
            RuleAction::ChannelList {
                channels,
                score,
                reason,
            } => Some((channels.as_slice(), *score, reason.as_deref())),
            _ => None,
        })
    }

    pub fn explanation(&self) -> Option<&str> {
        self.items.iter().find_map(|item| match item {
            RuleAction::Explanation(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

fn string_list(value: &serde_json::Value) -> Option<Vec<String>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

impl Serialize for RuleActions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RuleActions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(RuleActions::from_json(&json))
    }
}
