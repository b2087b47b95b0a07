//! File system based rule repository
//!
//! Layout:
//!
//! ```text
//! <root>/
//!   rules/
//!     1.yaml
//!     2.yaml
//! ```
//!
//! Each file holds one YAML document, a serialized [`RuleRecord`].

use async_trait::async_trait;
use chrono::Utc;
use maestro_core::{NewRule, RuleId};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use crate::{RepositoryError, RepositoryResult, RuleRecord, RulePatch, RuleRepository};

const RULES_DIR: &str = "rules";

/// Rule repository storing one YAML file per rule
pub struct FileSystemRuleRepository {
    /// Absolute root path of the repository
    root_path: PathBuf,
    /// Serializes id allocation and read-modify-write updates
    write_lock: Mutex<()>,
}

impl FileSystemRuleRepository {
    /// Open an existing repository directory
    ///
    /// # Example
    /// ```no_run
    /// use maestro_repository::FileSystemRuleRepository;
    ///
    /// let repo = FileSystemRuleRepository::new("data").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(root_path: P) -> RepositoryResult<Self> {
        let path = root_path.as_ref();

        if !path.is_dir() {
            return Err(RepositoryError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let abs_path = path
            .absolutize()
            .map_err(|e| RepositoryError::Other(format!("Failed to absolutize path: {}", e)))?
            .to_path_buf();

        Ok(Self {
            root_path: abs_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Open a repository, creating its directories if needed
    pub async fn create<P: AsRef<Path>>(root_path: P) -> RepositoryResult<Self> {
        let rules_dir = root_path.as_ref().join(RULES_DIR);
        fs::create_dir_all(&rules_dir).await?;
        Self::new(root_path)
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn rules_dir(&self) -> PathBuf {
        self.root_path.join(RULES_DIR)
    }

    fn rule_path(&self, id: RuleId) -> PathBuf {
        self.rules_dir().join(format!("{}.yaml", id))
    }

    /// Ids of every rule file, ascending
    async fn rule_ids(&self) -> RepositoryResult<Vec<RuleId>> {
        let dir = self.rules_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("yaml") {
                continue;
            }
            match path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<RuleId>().ok())
            {
                Some(id) => ids.push(id),
                None => tracing::warn!("Ignoring unexpected file in rules directory: {}", path.display()),
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    async fn read_record(&self, id: RuleId) -> RepositoryResult<Option<RuleRecord>> {
        let path = self.rule_path(id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: RuleRecord = serde_yaml::from_str(&content)?;
        Ok(Some(record))
    }

    /// Write through a temporary file so readers never see a partial document
    async fn write_record(&self, record: &RuleRecord) -> RepositoryResult<()> {
        let dir = self.rules_dir();
        fs::create_dir_all(&dir).await?;

        let content = serde_yaml::to_string(record)?;
        let path = self.rule_path(record.id);
        let tmp = dir.join(format!(".{}.yaml.tmp", record.id));
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl RuleRepository for FileSystemRuleRepository {
    async fn list_active_rules(&self) -> RepositoryResult<Vec<RuleRecord>> {
        let mut rules = Vec::new();
        for id in self.rule_ids().await? {
            match self.read_record(id).await {
                Ok(Some(record)) if record.is_active => rules.push(record),
                Ok(_) => {}
                Err(e) => tracing::warn!("Skipping unreadable rule file {}: {}", id, e),
            }
        }
        tracing::debug!("Listed {} active rules from {}", rules.len(), self.root_path.display());
        Ok(rules)
    }

    async fn get_rule(&self, id: RuleId) -> RepositoryResult<Option<RuleRecord>> {
        self.read_record(id).await
    }

    async fn insert_rule(&self, rule: NewRule) -> RepositoryResult<RuleRecord> {
        rule.validate()?;

        let _guard = self.write_lock.lock().await;
        let id = self.rule_ids().await?.last().map_or(1, |max| max + 1);
        let record = RuleRecord::from_new(id, rule, Utc::now());
        self.write_record(&record).await?;

        tracing::info!("Stored rule {} ('{}')", record.id, record.name);
        Ok(record)
    }

    async fn update_rule(&self, id: RuleId, patch: RulePatch) -> RepositoryResult<RuleRecord> {
        let _guard = self.write_lock.lock().await;
        let mut record = self
            .read_record(id)
            .await?
            .ok_or(RepositoryError::NotFound { id })?;
        patch.apply(&mut record, Utc::now());
        self.write_record(&record).await?;

        tracing::info!("Updated rule {} ('{}')", record.id, record.name);
        Ok(record)
    }
}
