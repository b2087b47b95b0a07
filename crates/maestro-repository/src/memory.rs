//! In-memory rule repository

use async_trait::async_trait;
use chrono::Utc;
use maestro_core::{NewRule, RuleId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::{RepositoryError, RepositoryResult, RuleRecord, RulePatch, RuleRepository};

/// Rule repository backed by a map in process memory
///
/// Used for tests and for running without a data directory. It can be
/// switched into an unavailable state to exercise persistence failures.
#[derive(Debug, Default)]
pub struct MemoryRuleRepository {
    rules: RwLock<BTreeMap<RuleId, RuleRecord>>,
    unavailable: AtomicBool,
}

impl MemoryRuleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing rows, e.g. legacy string-encoded ones
    pub fn with_records(records: impl IntoIterator<Item = RuleRecord>) -> Self {
        let rules = records.into_iter().map(|r| (r.id, r)).collect();
        Self {
            rules: RwLock::new(rules),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make every subsequent call fail with `RepositoryError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }

    fn check_available(&self) -> RepositoryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "memory repository switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RuleRepository for MemoryRuleRepository {
    async fn list_active_rules(&self) -> RepositoryResult<Vec<RuleRecord>> {
        self.check_available()?;
        let rules = self.rules.read().await;
        Ok(rules.values().filter(|r| r.is_active).cloned().collect())
    }

    async fn get_rule(&self, id: RuleId) -> RepositoryResult<Option<RuleRecord>> {
        self.check_available()?;
        Ok(self.rules.read().await.get(&id).cloned())
    }

    async fn insert_rule(&self, rule: NewRule) -> RepositoryResult<RuleRecord> {
        self.check_available()?;
        rule.validate()?;

        let mut rules = self.rules.write().await;
        let id = rules.keys().next_back().map_or(1, |max| max + 1);
        let record = RuleRecord::from_new(id, rule, Utc::now());
        rules.insert(id, record.clone());
        Ok(record)
    }

    async fn update_rule(&self, id: RuleId, patch: RulePatch) -> RepositoryResult<RuleRecord> {
        self.check_available()?;
        let mut rules = self.rules.write().await;
        let record = rules.get_mut(&id).ok_or(RepositoryError::NotFound { id })?;
        patch.apply(record, Utc::now());
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_rule(name: &str) -> NewRule {
        NewRule::new(
            name,
            "ctr_prediction",
            json!({"field": "industry", "value": "technology"}),
            json!({"ctr": 0.08}),
        )
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let repo = MemoryRuleRepository::new();
        let a = repo.insert_rule(new_rule("a")).await.unwrap();
        let b = repo.insert_rule(new_rule("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_list_active_only() {
        let repo = MemoryRuleRepository::new();
        repo.insert_rule(new_rule("on")).await.unwrap();
        repo.insert_rule(new_rule("off").inactive()).await.unwrap();

        let active = repo.list_active_rules().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "on");
        assert!(repo.get_rule(2).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_missing_rule() {
        let repo = MemoryRuleRepository::new();
        let err = repo.update_rule(99, RulePatch::default()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound { id: 99 }));
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_rule() {
        let repo = MemoryRuleRepository::new();
        let err = repo
            .insert_rule(NewRule::new("", "ctr_prediction", json!({}), json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRule(_)));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn test_unavailable_switch() {
        let repo = MemoryRuleRepository::new();
        repo.set_unavailable(true);
        assert!(matches!(
            repo.list_active_rules().await,
            Err(RepositoryError::Unavailable(_))
        ));
        repo.set_unavailable(false);
        assert!(repo.list_active_rules().await.is_ok());
    }
}
