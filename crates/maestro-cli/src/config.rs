//! Configuration loading for the `maestro` binary

use anyhow::Context as _;
use maestro_sdk::{EngineConfig, RepositoryConfig};
use std::path::{Path, PathBuf};

/// Looked up without extension: `config/maestro.toml`, `.yaml`, `.json`, ...
const DEFAULT_CONFIG: &str = "config/maestro";
const ENV_PREFIX: &str = "MAESTRO";

/// Load configuration from a file and `MAESTRO__*` environment variables
///
/// An explicit `path` must exist. Without one, `config/maestro.*` is used
/// when present and defaults otherwise. Nested keys use a double
/// underscore, e.g. `MAESTRO__INFERENCE__BASE_CTR=0.04`.
pub fn load(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    dotenvy::dotenv().ok();

    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG).required(false),
    };
    let settings = config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read configuration")?;

    let config: EngineConfig = settings
        .try_deserialize()
        .context("failed to deserialize configuration")?;
    Ok(config)
}

/// Command-line flags that take precedence over the loaded file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub models_path: Option<PathBuf>,
    pub repository: Option<PathBuf>,
}

impl Overrides {
    pub fn apply(self, mut config: EngineConfig) -> EngineConfig {
        if let Some(path) = self.models_path {
            config.models_path = path;
        }
        if let Some(dir) = self.repository {
            config.repository = RepositoryConfig::file_system(dir.to_string_lossy());
        }
        config
    }
}
