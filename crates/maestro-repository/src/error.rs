//! Error types for the repository layer

use maestro_core::{CoreError, RuleId};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors that can occur during repository operations
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// No rule with the given id
    #[error("Rule not found: {id}")]
    NotFound { id: RuleId },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Rule rejected before it was stored
    #[error("Invalid rule: {0}")]
    InvalidRule(#[from] CoreError),

    /// Invalid path provided
    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// Backing store cannot be reached
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
