//! Rule persistence for the Maestro Strategic Mind
//!
//! The knowledge base talks to storage only through the [`RuleRepository`]
//! trait. Two backends are provided:
//!
//! - [`MemoryRuleRepository`]: process-local, used by tests and ephemeral runs
//! - [`FileSystemRuleRepository`]: one YAML document per rule on disk
//!
//! # Quick Start
//!
//! ```no_run
//! use maestro_repository::{open_repository, RepositoryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = open_repository(&RepositoryConfig::file_system("data")).await?;
//!     for record in repo.list_active_rules().await? {
//!         println!("{} {}", record.id, record.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod file_system;
pub mod memory;
pub mod record;
pub mod traits;

pub use config::{open_repository, ConfigError, RepositoryConfig, RepositorySource};
pub use error::{RepositoryError, RepositoryResult};
pub use file_system::FileSystemRuleRepository;
pub use memory::MemoryRuleRepository;
pub use record::{RulePatch, RuleRecord};
pub use traits::RuleRepository;
