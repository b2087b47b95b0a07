//! Engine configuration

use maestro_ml::CoercionMode;
use maestro_repository::RepositoryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, SdkError};

/// Top-level configuration for a Strategic Mind instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Where rules are persisted
    pub repository: RepositoryConfig,

    /// Directory holding model artifacts
    pub models_path: PathBuf,

    /// How non-numeric feature values are handled
    pub coercion: CoercionMode,

    /// Inference tiers and constants
    pub inference: InferenceConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repository(mut self, repository: RepositoryConfig) -> Self {
        self.repository = repository;
        self
    }

    pub fn with_models_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.models_path = path.into();
        self
    }

    pub fn with_coercion(mut self, coercion: CoercionMode) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_inference(mut self, inference: InferenceConfig) -> Self {
        self.inference = inference;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.repository.validate()?;
        self.inference.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repository: RepositoryConfig::default(),
            models_path: PathBuf::from("./ml_models"),
            coercion: CoercionMode::default(),
            inference: InferenceConfig::default(),
        }
    }
}

/// Constants used by the inference tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub rule_confidence: f64,
    /// Used when a loaded model has no stored metrics
    pub default_model_confidence: f64,
    pub heuristic_confidence: f64,
    pub fallback_confidence: f64,

    pub model_weight: f64,
    pub rule_weight: f64,

    pub base_ctr: f64,
    pub base_roi: f64,
    pub fallback_ctr: f64,
    pub fallback_roi: f64,

    pub ctr_benchmark: f64,
    pub roi_benchmark: f64,

    /// Blend a rule answer with the model instead of returning it directly
    pub blend_rules_with_model: bool,

    pub max_channel_recommendations: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            rule_confidence: 0.9,
            default_model_confidence: 0.7,
            heuristic_confidence: 0.6,
            fallback_confidence: 0.3,
            model_weight: 0.7,
            rule_weight: 0.3,
            base_ctr: 0.05,
            base_roi: 2.0,
            fallback_ctr: 0.02,
            fallback_roi: 1.0,
            ctr_benchmark: 0.025,
            roi_benchmark: 2.1,
            blend_rules_with_model: false,
            max_channel_recommendations: 5,
        }
    }
}

impl InferenceConfig {
    pub fn validate(&self) -> Result<()> {
        let confidences = [
            ("rule_confidence", self.rule_confidence),
            ("default_model_confidence", self.default_model_confidence),
            ("heuristic_confidence", self.heuristic_confidence),
            ("fallback_confidence", self.fallback_confidence),
        ];
        for (name, value) in confidences {
            if !(0.0..=1.0).contains(&value) {
                return Err(SdkError::ConfigError(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("model_weight", self.model_weight), ("rule_weight", self.rule_weight)] {
            if !value.is_finite() || value < 0.0 {
                return Err(SdkError::ConfigError(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.max_channel_recommendations == 0 {
            return Err(SdkError::ConfigError(
                "max_channel_recommendations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
