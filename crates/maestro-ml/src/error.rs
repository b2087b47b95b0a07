//! Error types for model loading, training and inference

use thiserror::Error;

use crate::ModelKind;

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Model error types
#[derive(Error, Debug)]
pub enum ModelError {
    /// No model of this kind has been loaded or trained
    #[error("{0} model not loaded")]
    ModelUnavailable(ModelKind),

    /// A required feature is absent from the context (or cannot be coerced)
    #[error("Insufficient features for {kind} prediction: missing {missing:?}, invalid {invalid:?}")]
    InsufficientFeatures {
        kind: ModelKind,
        missing: Vec<String>,
        invalid: Vec<String>,
    },

    /// The estimator failed or produced a non-finite value
    #[error("Inference error: {0}")]
    Inference(String),

    /// Training could not be completed
    #[error("Training error: {0}")]
    Training(String),

    /// Training data is unusable
    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    /// I/O error while reading or writing artifacts
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ModelError {
    /// Errors that mean "this tier cannot answer", as opposed to a failure
    pub fn is_not_applicable(&self) -> bool {
        matches!(
            self,
            ModelError::ModelUnavailable(_) | ModelError::InsufficientFeatures { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::ModelUnavailable(ModelKind::Ctr);
        assert_eq!(err.to_string(), "ctr model not loaded");

        let err = ModelError::InsufficientFeatures {
            kind: ModelKind::Roi,
            missing: vec!["budget".into()],
            invalid: vec![],
        };
        assert!(err.to_string().contains("budget"));
    }

    #[test]
    fn test_not_applicable() {
        assert!(ModelError::ModelUnavailable(ModelKind::Channel).is_not_applicable());
        assert!(!ModelError::Inference("boom".into()).is_not_applicable());
    }
}
