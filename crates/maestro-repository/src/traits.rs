//! The persistence collaborator used by the knowledge base

use async_trait::async_trait;
use maestro_core::{NewRule, RuleId};

use crate::{RepositoryResult, RuleRecord, RulePatch};

/// Rule storage
///
/// Implementations assign identity and timestamps on insert. The knowledge
/// base keeps its own cache and only calls back here on load and on writes.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    /// Every rule with `is_active = true`, in ascending id order
    async fn list_active_rules(&self) -> RepositoryResult<Vec<RuleRecord>>;

    /// Point lookup, active or not
    async fn get_rule(&self, id: RuleId) -> RepositoryResult<Option<RuleRecord>>;

    /// Persist a new rule and return the stored row
    async fn insert_rule(&self, rule: NewRule) -> RepositoryResult<RuleRecord>;

    /// Apply `patch` to an existing rule and return the stored row
    ///
    /// Fails with `RepositoryError::NotFound` if the rule does not exist.
    async fn update_rule(&self, id: RuleId, patch: RulePatch) -> RepositoryResult<RuleRecord>;
}
