//! Error types for Maestro Core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    #[error("Invalid action payload: {0}")]
    InvalidAction(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
