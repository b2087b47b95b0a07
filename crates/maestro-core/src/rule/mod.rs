//! Rule definitions
//!
//! A rule pairs a condition tree with an action payload. Rules are grouped by
//! `rule_type` (e.g. `ctr_prediction`, `roi_prediction`,
//! `channel_recommendation`) and ordered by descending priority.

mod action;
mod feedback;

pub use action::{Metric, RuleAction, RuleActions};
pub use feedback::RuleFeedback;

use crate::condition::{evaluate, Condition};
use crate::error::{CoreError, Result};
use crate::types::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Identity assigned by the persistence layer
pub type RuleId = i64;

/// A persisted, parsed rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule_type: String,
    pub conditions: Condition,
    pub actions: RuleActions,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Whether the rule's conditions hold for `context`
    pub fn matches(&self, context: &Context) -> bool {
        evaluate(&self.conditions, context)
    }

    pub fn to_match(&self) -> RuleMatch {
        RuleMatch {
            rule_id: self.id,
            rule_name: self.name.clone(),
            actions: self.actions.clone(),
        }
    }
}

/// Input for creating a rule; identity and timestamps are assigned on insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule_type: String,
    pub conditions: serde_json::Value,
    pub actions: serde_json::Value,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl NewRule {
    pub fn new(
        name: impl Into<String>,
        rule_type: impl Into<String>,
        conditions: serde_json::Value,
        actions: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            rule_type: rule_type.into(),
            conditions,
            actions,
            priority: 0,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Shape checks applied before a rule is persisted
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidRule("name must not be empty".to_string()));
        }
        if self.rule_type.trim().is_empty() {
            return Err(CoreError::InvalidRule(format!(
                "rule '{}' has an empty rule_type",
                self.name
            )));
        }
        if !self.conditions.is_object() {
            return Err(CoreError::InvalidCondition(format!(
                "conditions of rule '{}' must be a JSON object",
                self.name
            )));
        }
        if !self.actions.is_object() {
            return Err(CoreError::InvalidAction(format!(
                "actions of rule '{}' must be a JSON object",
                self.name
            )));
        }
        Ok(())
    }
}

fn default_active() -> bool {
    true
}

/// One rule that matched a context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub actions: RuleActions,
}

/// Shallow object update: top-level keys of `patch` replace those of `base`
///
/// A non-object `base` is replaced by `patch` as a whole.
pub fn merge_json(base: &serde_json::Value, patch: &Map<String, serde_json::Value>) -> serde_json::Value {
    let mut merged = base.as_object().cloned().unwrap_or_default();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    serde_json::Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_rule() -> Rule {
        let now = Utc::now();
        Rule {
            id: 1,
            name: "tech_ctr".to_string(),
            description: String::new(),
            rule_type: "ctr_prediction".to_string(),
            conditions: Condition::from_json(&json!({"field": "industry", "value": "technology"})),
            actions: RuleActions::from_json(&json!({"ctr": 0.08})),
            priority: 10,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_rule_matches() {
        let rule = sample_rule();
        let mut context = Context::new();
        assert!(!rule.matches(&context));
        context.insert("industry".to_string(), "technology".into());
        assert!(rule.matches(&context));

        let m = rule.to_match();
        assert_eq!(m.rule_id, 1);
        assert_eq!(m.actions.rate(Metric::Ctr), Some(0.08));
    }

    #[test]
    fn test_rule_serde_round_trip() {
        let rule = sample_rule();
        let text = serde_json::to_string(&rule).unwrap();
        let back: Rule = serde_json::from_str(&text).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_new_rule_defaults() {
        let new_rule: NewRule = serde_json::from_value(json!({
            "name": "r",
            "rule_type": "ctr_prediction",
            "conditions": {"field": "a", "value": 1},
            "actions": {"ctr": 0.1}
        }))
        .unwrap();
        assert_eq!(new_rule.priority, 0);
        assert!(new_rule.is_active);
        assert!(new_rule.validate().is_ok());
    }

    #[test]
    fn test_new_rule_validation() {
        let bad_name = NewRule::new(" ", "ctr_prediction", json!({}), json!({}));
        assert!(matches!(bad_name.validate(), Err(CoreError::InvalidRule(_))));

        let bad_conditions = NewRule::new("r", "ctr_prediction", json!([1]), json!({}));
        assert!(matches!(bad_conditions.validate(), Err(CoreError::InvalidCondition(_))));

        let bad_actions = NewRule::new("r", "ctr_prediction", json!({}), json!("x"));
        assert!(matches!(bad_actions.validate(), Err(CoreError::InvalidAction(_))));
    }

    #[test]
    fn test_merge_json_is_shallow() {
        let base = json!({"field": "industry", "value": "retail", "extra": {"a": 1}});
        let patch = json!({"value": "fashion", "extra": {"b": 2}});
        let merged = merge_json(&base, patch.as_object().unwrap());
        assert_eq!(
            merged,
            json!({"field": "industry", "value": "fashion", "extra": {"b": 2}})
        );
    }

    #[test]
    fn test_merge_json_into_non_object() {
        let patch = json!({"ctr": 0.1});
        assert_eq!(merge_json(&json!(null), patch.as_object().unwrap()), patch);
    }
}
