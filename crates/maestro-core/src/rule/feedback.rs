//! Per-rule feedback

use super::RuleId;
use serde::{Deserialize, Serialize};
use serde_json::Map;

/// Feedback on a single rule
///
/// `is_useful` moves the rule's priority up or down by one. Suggested
/// conditions and actions are shallow-merged into the rule's stored JSON,
/// replacing top-level keys they name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFeedback {
    pub rule_id: RuleId,

    #[serde(default)]
    pub is_useful: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_conditions: Option<Map<String, serde_json::Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_actions: Option<Map<String, serde_json::Value>>,
}

impl RuleFeedback {
    pub fn useful(rule_id: RuleId) -> Self {
        Self {
            rule_id,
            is_useful: true,
            suggested_conditions: None,
            suggested_actions: None,
        }
    }

    pub fn not_useful(rule_id: RuleId) -> Self {
        Self {
            is_useful: false,
            ..Self::useful(rule_id)
        }
    }

    pub fn with_suggested_conditions(mut self, conditions: Map<String, serde_json::Value>) -> Self {
        self.suggested_conditions = Some(conditions);
        self
    }

    pub fn with_suggested_actions(mut self, actions: Map<String, serde_json::Value>) -> Self {
        self.suggested_actions = Some(actions);
        self
    }

    /// Priority after applying this feedback, never below zero
    pub fn adjust_priority(&self, priority: i64) -> i64 {
        if self.is_useful {
            priority.saturating_add(1)
        } else {
            priority.saturating_sub(1).max(0)
        }
    }
}
