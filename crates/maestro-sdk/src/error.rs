//! SDK error types

use maestro_core::{CoreError, RuleId};
use maestro_ml::ModelError;
use maestro_repository::{ConfigError, RepositoryError};
use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Rule persistence error
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Model store error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Rule definition error
    #[error("Rule error: {0}")]
    Core(#[from] CoreError),

    /// Rule is not known to the knowledge base
    #[error("Rule not found: {0}")]
    RuleNotFound(RuleId),

    /// Knowledge base has no persistence collaborator
    #[error("Knowledge base is detached from rule storage")]
    Detached,

    /// Generic SDK error
    #[error("SDK error: {0}")]
    GenericError(String),
}

impl From<ConfigError> for SdkError {
    fn from(err: ConfigError) -> Self {
        SdkError::ConfigError(err.to_string())
    }
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
