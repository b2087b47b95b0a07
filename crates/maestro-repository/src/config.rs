//! Repository configuration types

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::{FileSystemRuleRepository, MemoryRuleRepository, RepositoryResult, RuleRepository};

/// Repository source type
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepositorySource {
    /// Process-local store, lost on exit
    #[default]
    Memory,
    /// One YAML file per rule under `<base_path>/rules`
    #[serde(alias = "file_system")]
    FileSystem,
}

/// Repository configuration
///
/// # Examples
///
/// ```rust
/// use maestro_repository::RepositoryConfig;
///
/// let config = RepositoryConfig::file_system("data");
/// assert!(config.validate().is_ok());
///
/// let config = RepositoryConfig::memory();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Configuration source type
    #[serde(default)]
    pub source: RepositorySource,

    /// File system base path (required for FileSystem source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
}

impl RepositoryConfig {
    pub fn file_system(path: impl Into<String>) -> Self {
        Self {
            source: RepositorySource::FileSystem,
            base_path: Some(path.into()),
        }
    }

    pub fn memory() -> Self {
        Self {
            source: RepositorySource::Memory,
            base_path: None,
        }
    }

    /// Validate the configuration
    ///
    /// Returns an error if required fields are missing for the selected source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.source {
            RepositorySource::FileSystem => match self.base_path.as_deref() {
                Some(path) if !path.trim().is_empty() => Ok(()),
                _ => Err(ConfigError::MissingField {
                    backend: "FileSystem".to_string(),
                    field: "base_path".to_string(),
                }),
            },
            RepositorySource::Memory => Ok(()),
        }
    }
}

/// Configuration error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A required field is missing for the selected source
    #[error("{backend} source requires {field} to be set")]
    MissingField { backend: String, field: String },
}

/// Open the rule store described by `config`
///
/// File-system stores create their base directory when it does not exist yet.
pub async fn open_repository(config: &RepositoryConfig) -> RepositoryResult<Arc<dyn RuleRepository>> {
    config.validate()?;
    match config.source {
        RepositorySource::Memory => {
            tracing::info!("Using in-memory rule repository");
            Ok(Arc::new(MemoryRuleRepository::new()))
        }
        RepositorySource::FileSystem => {
            let base = config.base_path.as_deref().unwrap_or_default();
            let repo = FileSystemRuleRepository::create(base).await?;
            tracing::info!("Using file system rule repository at {}", repo.root_path().display());
            Ok(Arc::new(repo))
        }
    }
}
