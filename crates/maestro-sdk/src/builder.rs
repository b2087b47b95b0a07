//! Builder for a ready-to-use inference engine

use maestro_ml::{CoercionMode, ModelStore};
use maestro_repository::{open_repository, RepositoryConfig, RuleRepository};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{EngineConfig, InferenceConfig};
use crate::error::Result;
use crate::inference::HybridInferenceEngine;
use crate::knowledge_base::DynamicKnowledgeBase;

/// Builder for [`HybridInferenceEngine`]
///
/// # Example
///
/// ```rust,ignore
/// use maestro_sdk::{RepositoryConfig, StrategicMindBuilder};
///
/// let engine = StrategicMindBuilder::new()
///     .with_repository(RepositoryConfig::file_system("data"))
///     .with_models_path("ml_models")
///     .build()
///     .await?;
/// ```
pub struct StrategicMindBuilder {
    config: EngineConfig,
    rule_repository: Option<Arc<dyn RuleRepository>>,
    model_store: Option<Arc<ModelStore>>,
}

impl StrategicMindBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::new(),
            rule_repository: None,
            model_store: None,
        }
    }

    /// Start from a full configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Where rules are persisted; ignored if a repository is injected
    pub fn with_repository(mut self, repository: RepositoryConfig) -> Self {
        self.config.repository = repository;
        self
    }

    /// Use an already-open rule repository
    pub fn with_rule_repository(mut self, repository: Arc<dyn RuleRepository>) -> Self {
        self.rule_repository = Some(repository);
        self
    }

    /// Model artifact directory; ignored if a store is injected
    pub fn with_models_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.models_path = path.into();
        self
    }

    /// Use an already-populated model store
    pub fn with_model_store(mut self, store: Arc<ModelStore>) -> Self {
        self.model_store = Some(store);
        self
    }

    pub fn with_coercion(mut self, coercion: CoercionMode) -> Self {
        self.config.coercion = coercion;
        self
    }

    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.config.inference = inference;
        self
    }

    /// Open storage, load rules and models, and assemble the engine
    pub async fn build(self) -> Result<HybridInferenceEngine> {
        self.config.validate()?;

        let repository = match self.rule_repository {
            Some(repository) => repository,
            None => open_repository(&self.config.repository).await?,
        };
        let knowledge_base = Arc::new(DynamicKnowledgeBase::new(repository));
        knowledge_base.load().await;

        let models = match self.model_store {
            Some(store) => store,
            None => Arc::new(ModelStore::open(&self.config.models_path, self.config.coercion).await),
        };

        tracing::info!(
            "Strategic Mind ready ({} rule(s), {} model(s))",
            knowledge_base.status().await.rule_count,
            models.performance_report().await.loaded_models.len()
        );
        Ok(HybridInferenceEngine::new(
            knowledge_base,
            models,
            self.config.inference,
        ))
    }
}

impl Default for StrategicMindBuilder {
    fn default() -> Self {
        Self::new()
    }
}
