//! Dynamic knowledge base: cached, prioritized rules with feedback
//!
//! The cache holds active rules only. Reads (`get_rules`, `evaluate`) share
//! the cache lock. Mutations run one at a time under `write_lock`, held from
//! the storage read through the cache refresh.

use chrono::{DateTime, Utc};
use maestro_core::{merge_json, Context, NewRule, Rule, RuleFeedback, RuleId, RuleMatch};
use maestro_repository::{RulePatch, RuleRepository};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, SdkError};

/// Snapshot of the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseStatus {
    pub rule_count: usize,
    pub active_count: usize,
    pub rule_types: Vec<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Cache {
    rules: BTreeMap<RuleId, Rule>,
    last_updated: Option<DateTime<Utc>>,
}

impl Cache {
    fn put(&mut self, rule: Rule) {
        if rule.is_active {
            self.rules.insert(rule.id, rule);
        } else {
            self.rules.remove(&rule.id);
        }
        self.last_updated = Some(Utc::now());
    }
}

/// Rule engine over a persistence collaborator
pub struct DynamicKnowledgeBase {
    repository: Option<Arc<dyn RuleRepository>>,
    cache: RwLock<Cache>,
    write_lock: Mutex<()>,
}

impl DynamicKnowledgeBase {
    /// Knowledge base backed by `repository`; call [`load`](Self::load) to fill the cache
    pub fn new(repository: Arc<dyn RuleRepository>) -> Self {
        Self {
            repository: Some(repository),
            cache: RwLock::new(Cache::default()),
            write_lock: Mutex::new(()),
        }
    }

    /// Knowledge base with no storage: empty, and every write is a no-op
    pub fn detached() -> Self {
        Self {
            repository: None,
            cache: RwLock::new(Cache::default()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.repository.is_none()
    }

    fn repository(&self) -> Result<&Arc<dyn RuleRepository>> {
        self.repository.as_ref().ok_or(SdkError::Detached)
    }

    /// Replace the cache with the active rules from storage
    ///
    /// A storage failure is logged and leaves the cache empty. Returns the
    /// number of rules cached.
    pub async fn load(&self) -> usize {
        let _guard = self.write_lock.lock().await;
        let records = match self.repository() {
            Ok(repository) => match repository.list_active_rules().await {
                Ok(records) => records,
                Err(e) => {
                    tracing::error!("Error loading rules: {}", e);
                    Vec::new()
                }
            },
            Err(_) => Vec::new(),
        };

        let rules: BTreeMap<RuleId, Rule> = records
            .into_iter()
            .map(|record| record.into_rule())
            .filter(|rule| rule.is_active)
            .map(|rule| (rule.id, rule))
            .collect();
        let count = rules.len();

        let mut cache = self.cache.write().await;
        cache.rules = rules;
        cache.last_updated = Some(Utc::now());
        tracing::info!("Loaded {} rules into knowledge base", count);
        count
    }

    /// Persist a new rule and cache it if active
    ///
    /// Returns `None` when detached or when the rule cannot be stored.
    pub async fn add_rule(&self, rule: NewRule) -> Option<Rule> {
        match self.try_add_rule(rule).await {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::error!("Error adding rule: {}", e);
                None
            }
        }
    }

    pub async fn try_add_rule(&self, rule: NewRule) -> Result<Rule> {
        let _guard = self.write_lock.lock().await;
        let record = self.repository()?.insert_rule(rule).await?;
        let rule = record.into_rule();
        tracing::info!("Added rule {} ('{}')", rule.id, rule.name);
        self.cache.write().await.put(rule.clone());
        Ok(rule)
    }

    /// Cached rules, optionally of one type, by descending priority
    ///
    /// Equal priorities come back in ascending id order.
    pub async fn get_rules(&self, rule_type: Option<&str>) -> Vec<Rule> {
        let cache = self.cache.read().await;
        let mut rules: Vec<Rule> = cache
            .rules
            .values()
            .filter(|rule| rule_type.map_or(true, |t| rule.rule_type == t))
            .cloned()
            .collect();
        // stable: BTreeMap iteration already orders ties by id
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        rules
    }

    pub async fn get_rule(&self, id: RuleId) -> Option<Rule> {
        self.cache.read().await.rules.get(&id).cloned()
    }

    /// Every cached rule matching `context`, in priority order
    pub async fn evaluate(&self, context: &Context, rule_type: Option<&str>) -> Vec<RuleMatch> {
        let matches: Vec<RuleMatch> = self
            .get_rules(rule_type)
            .await
            .iter()
            .filter(|rule| rule.matches(context))
            .map(Rule::to_match)
            .collect();
        tracing::debug!(
            "{} rule(s) matched for type {}",
            matches.len(),
            rule_type.unwrap_or("*")
        );
        matches
    }

    /// Apply feedback to a cached rule
    ///
    /// Returns false if the rule is not cached, the knowledge base is
    /// detached, or the update cannot be persisted.
    pub async fn update_from_feedback(&self, rule_id: RuleId, feedback: &RuleFeedback) -> bool {
        match self.try_update_from_feedback(rule_id, feedback).await {
            Ok(updated) => updated,
            Err(e) => {
                tracing::error!("Error applying feedback to rule {}: {}", rule_id, e);
                false
            }
        }
    }

    /// Like [`update_from_feedback`](Self::update_from_feedback), but keeps
    /// storage failures apart from unknown rules: `Ok(false)` means there was
    /// nothing to update.
    pub async fn try_update_from_feedback(
        &self,
        rule_id: RuleId,
        feedback: &RuleFeedback,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.get_rule(rule_id).await.is_none() {
            tracing::warn!("Feedback for unknown rule {}", rule_id);
            return Ok(false);
        }
        let repository = match self.repository() {
            Ok(repository) => repository,
            Err(_) => return Ok(false),
        };

        let stored = repository
            .get_rule(rule_id)
            .await?
            .ok_or(SdkError::RuleNotFound(rule_id))?;

        let mut patch = RulePatch {
            priority: Some(feedback.adjust_priority(stored.priority)),
            ..RulePatch::default()
        };
        if let Some(suggested) = &feedback.suggested_conditions {
            patch.conditions = Some(merge_json(&stored.conditions_json(), suggested));
        }
        if let Some(suggested) = &feedback.suggested_actions {
            patch.actions = Some(merge_json(&stored.actions_json(), suggested));
        }

        let record = repository.update_rule(rule_id, patch).await?;
        let rule = record.into_rule();
        tracing::info!(
            "Rule {} updated from feedback (useful: {}, priority {} -> {})",
            rule_id,
            feedback.is_useful,
            stored.priority,
            rule.priority
        );
        self.cache.write().await.put(rule);
        Ok(true)
    }

    /// Persist a partial update and refresh the cache
    ///
    /// Deactivating a rule evicts it. Returns `None` when detached, when
    /// the rule does not exist, or when storage fails.
    pub async fn update_rule(&self, id: RuleId, patch: RulePatch) -> Option<Rule> {
        match self.try_update_rule(id, patch).await {
            Ok(rule) => Some(rule),
            Err(e) => {
                tracing::error!("Error updating rule {}: {}", id, e);
                None
            }
        }
    }

    pub async fn try_update_rule(&self, id: RuleId, patch: RulePatch) -> Result<Rule> {
        let _guard = self.write_lock.lock().await;
        let record = self.repository()?.update_rule(id, patch).await?;
        let rule = record.into_rule();
        tracing::info!("Rule {} updated (active: {})", rule.id, rule.is_active);
        self.cache.write().await.put(rule.clone());
        Ok(rule)
    }

    pub async fn status(&self) -> KnowledgeBaseStatus {
        let cache = self.cache.read().await;
        let rule_types: BTreeSet<&str> = cache.rules.values().map(|r| r.rule_type.as_str()).collect();
        KnowledgeBaseStatus {
            rule_count: cache.rules.len(),
            active_count: cache.rules.values().filter(|r| r.is_active).count(),
            rule_types: rule_types.into_iter().map(str::to_string).collect(),
            last_updated: cache.last_updated,
        }
    }
}
