//! Stored rule rows and update payloads
//!
//! A [`RuleRecord`] is the loosely-typed shape rules have at rest. Conditions
//! and actions are JSON, and rows written by older deployments may hold them
//! as JSON-encoded strings. [`RuleRecord::into_rule`] is the single place that
//! turns a row into a typed [`Rule`].

use chrono::{DateTime, Utc};
use maestro_core::{Condition, NewRule, Rule, RuleActions, RuleId};
use serde::{Deserialize, Serialize};

/// A rule as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleRecord {
    pub id: RuleId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub rule_type: String,
    #[serde(default)]
    pub conditions: serde_json::Value,
    #[serde(default)]
    pub actions: serde_json::Value,
    #[serde(default)]
    pub priority: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl RuleRecord {
    /// Build the stored row for a new rule
    pub fn from_new(id: RuleId, rule: NewRule, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: rule.name,
            description: rule.description,
            rule_type: rule.rule_type,
            conditions: rule.conditions,
            actions: rule.actions,
            priority: rule.priority,
            is_active: rule.is_active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Conditions as a JSON value, decoding a string-encoded column
    pub fn conditions_json(&self) -> serde_json::Value {
        decode_column(&self.conditions)
    }

    /// Actions as a JSON value, decoding a string-encoded column
    pub fn actions_json(&self) -> serde_json::Value {
        decode_column(&self.actions)
    }

    /// Parse into a typed rule
    ///
    /// Never fails: malformed conditions become `Condition::Invalid` (which
    /// never matches) and malformed actions become empty actions.
    pub fn into_rule(self) -> Rule {
        let conditions = match &self.conditions {
            serde_json::Value::String(text) => Condition::from_json_str(text),
            other => Condition::from_json(other),
        };
        let actions = match &self.actions {
            serde_json::Value::String(text) => RuleActions::from_json_str(text),
            other => RuleActions::from_json(other),
        };
        if conditions.has_invalid() {
            tracing::warn!(
                "Rule {} ('{}') has malformed conditions and will never match",
                self.id,
                self.name
            );
        }

        Rule {
            id: self.id,
            name: self.name,
            description: self.description,
            rule_type: self.rule_type,
            conditions,
            actions,
            priority: self.priority,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn decode_column(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::String(text) => match serde_json::from_str(text) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("Stored JSON column could not be decoded: {}", e);
                serde_json::Value::Object(Default::default())
            }
        },
        serde_json::Value::Null => serde_json::Value::Object(Default::default()),
        other => other.clone(),
    }
}

/// Partial update of a stored rule; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        *self == RulePatch::default()
    }

    /// Apply the patch in place and bump `updated_at`
    pub fn apply(self, record: &mut RuleRecord, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(conditions) = self.conditions {
            record.conditions = conditions;
        }
        if let Some(actions) = self.actions {
            record.actions = actions;
        }
        if let Some(priority) = self.priority {
            record.priority = priority;
        }
        if let Some(is_active) = self.is_active {
            record.is_active = is_active;
        }
        record.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::{Context, Metric};
    use serde_json::json;

    fn record(conditions: serde_json::Value, actions: serde_json::Value) -> RuleRecord {
        RuleRecord::from_new(
            3,
            NewRule::new("r", "ctr_prediction", conditions, actions),
            Utc::now(),
        )
    }

    #[test]
    fn test_into_rule_parses_objects() {
        let rule = record(
            json!({"field": "industry", "value": "technology"}),
            json!({"ctr": 0.08}),
        )
        .into_rule();
        let mut ctx = Context::new();
        ctx.insert("industry".into(), "technology".into());
        assert!(rule.matches(&ctx));
        assert_eq!(rule.actions.rate(Metric::Ctr), Some(0.08));
    }

    #[test]
    fn test_into_rule_decodes_string_columns() {
        let rule = record(
            json!(r#"{"field": "channel", "value": "email"}"#),
            json!(r#"{"roi": 3.0}"#),
        )
        .into_rule();
        assert_eq!(rule.conditions, Condition::equals("channel", "email"));
        assert_eq!(rule.actions.rate(Metric::Roi), Some(3.0));
    }

    #[test]
    fn test_into_rule_never_fails_on_garbage() {
        let rule = record(json!("{broken"), json!(17)).into_rule();
        assert!(rule.conditions.has_invalid());
        assert!(rule.actions.is_empty());
        assert!(!rule.matches(&Context::new()));
    }

    #[test]
    fn test_column_decoding() {
        let rec = record(json!(r#"{"field": "a", "value": 1}"#), serde_json::Value::Null);
        assert_eq!(rec.conditions_json(), json!({"field": "a", "value": 1}));
        assert_eq!(rec.actions_json(), json!({}));
    }

    #[test]
    fn test_patch_apply() {
        let mut rec = record(json!({"field": "a", "value": 1}), json!({"ctr": 0.1}));
        let before = rec.updated_at;
        let patch = RulePatch {
            priority: Some(9),
            is_active: Some(false),
            ..Default::default()
        };
        assert!(!patch.is_empty());
        patch.apply(&mut rec, before + chrono::Duration::seconds(1));
        assert_eq!(rec.priority, 9);
        assert!(!rec.is_active);
        assert_eq!(rec.name, "r");
        assert!(rec.updated_at > before);
        assert!(RulePatch::default().is_empty());
    }
}
