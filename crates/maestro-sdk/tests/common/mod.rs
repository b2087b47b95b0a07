//! Shared helpers for SDK integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use maestro_core::{context_from_json, Context, NewRule, RuleId};
use maestro_ml::{CoercionMode, ModelError, ModelKind, ModelResult, ModelStore, Regressor};
use maestro_repository::{
    MemoryRuleRepository, RepositoryError, RepositoryResult, RulePatch, RuleRecord, RuleRepository,
};
use maestro_sdk::{DynamicKnowledgeBase, HybridInferenceEngine, InferenceConfig};
use serde_json::Value as JsonValue;
use std::sync::Arc;

pub fn ctx(json: JsonValue) -> Context {
    context_from_json(json)
}

pub fn rule(name: &str, rule_type: &str, conditions: JsonValue, actions: JsonValue) -> NewRule {
    NewRule::new(name, rule_type, conditions, actions)
}

/// Engine over an in-memory repository and an empty model store
pub struct TestEngine {
    pub repository: Arc<MemoryRuleRepository>,
    pub knowledge_base: Arc<DynamicKnowledgeBase>,
    pub models: Arc<ModelStore>,
    pub engine: HybridInferenceEngine,
}

impl TestEngine {
    pub fn new() -> Self {
        Self::with_config(InferenceConfig::default())
    }

    pub fn with_config(config: InferenceConfig) -> Self {
        let repository = Arc::new(MemoryRuleRepository::new());
        let knowledge_base = Arc::new(DynamicKnowledgeBase::new(repository.clone()));
        let models = Arc::new(ModelStore::new("unused-models", CoercionMode::Strict));
        let engine = HybridInferenceEngine::new(knowledge_base.clone(), models.clone(), config);
        Self {
            repository,
            knowledge_base,
            models,
            engine,
        }
    }

    pub async fn add(&self, rule: NewRule) -> RuleId {
        self.knowledge_base
            .add_rule(rule)
            .await
            .expect("rule should be stored")
            .id
    }

    pub async fn install_model(&self, kind: ModelKind, model: impl Regressor + 'static, features: &[&str]) {
        self.models
            .insert(
                kind,
                Arc::new(model),
                features.iter().map(|f| f.to_string()).collect(),
                None,
            )
            .await
            .expect("model should install");
    }
}

/// Returns a fixed value
pub struct ConstantModel {
    pub value: f64,
    pub n_features: usize,
}

impl Regressor for ConstantModel {
    fn predict_one(&self, _features: &[f64]) -> ModelResult<f64> {
        Ok(self.value)
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Returns the first feature; used to see one-hot channel inputs
pub struct EchoModel {
    pub n_features: usize,
}

impl Regressor for EchoModel {
    fn predict_one(&self, features: &[f64]) -> ModelResult<f64> {
        Ok(features[0])
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Panics if ever invoked
pub struct PanickingModel {
    pub n_features: usize,
}

impl Regressor for PanickingModel {
    fn predict_one(&self, _features: &[f64]) -> ModelResult<f64> {
        panic!("estimator must not be called");
    }

    fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Always fails with an inference error
pub struct BrokenModel;

impl Regressor for BrokenModel {
    fn predict_one(&self, _features: &[f64]) -> ModelResult<f64> {
        Err(ModelError::Inference("weights corrupted".to_string()))
    }

    fn n_features(&self) -> usize {
        1
    }
}

/// Memory repository whose writes fail after setup
pub struct ReadOnlyRepository {
    pub inner: MemoryRuleRepository,
}

#[async_trait]
impl RuleRepository for ReadOnlyRepository {
    async fn list_active_rules(&self) -> RepositoryResult<Vec<RuleRecord>> {
        self.inner.list_active_rules().await
    }

    async fn get_rule(&self, id: RuleId) -> RepositoryResult<Option<RuleRecord>> {
        self.inner.get_rule(id).await
    }

    async fn insert_rule(&self, _rule: NewRule) -> RepositoryResult<RuleRecord> {
        Err(RepositoryError::Unavailable("read-only".to_string()))
    }

    async fn update_rule(&self, _id: RuleId, _patch: RulePatch) -> RepositoryResult<RuleRecord> {
        Err(RepositoryError::Unavailable("read-only".to_string()))
    }
}

/// In-memory repository that yields to the scheduler before every read
pub struct YieldingRepository {
    pub inner: MemoryRuleRepository,
}

#[async_trait]
impl RuleRepository for YieldingRepository {
    async fn list_active_rules(&self) -> RepositoryResult<Vec<RuleRecord>> {
        let records = self.inner.list_active_rules().await;
        tokio::task::yield_now().await;
        records
    }

    async fn get_rule(&self, id: RuleId) -> RepositoryResult<Option<RuleRecord>> {
        let record = self.inner.get_rule(id).await;
        tokio::task::yield_now().await;
        record
    }

    async fn insert_rule(&self, rule: NewRule) -> RepositoryResult<RuleRecord> {
        self.inner.insert_rule(rule).await
    }

    async fn update_rule(&self, id: RuleId, patch: RulePatch) -> RepositoryResult<RuleRecord> {
        self.inner.update_rule(id, patch).await
    }
}
