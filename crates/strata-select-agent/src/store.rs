//! TOML-backed configuration store.
//!
//! The file holds the tunables as `[[appdata]]` name/value pairs and the
//! routing-priority rules as `[[rules]]`:
//!
//! ```toml
//! [[appdata]]
//! name = "scan_time_sec"
//! value = "180"
//!
//! [[rules]]
//! id = "wwan0"
//! priority = 1.0
//! ```
//!
//! Every call re-reads the file so operators can edit it while the daemon
//! runs. Writes go to a sibling temp file which is then renamed over the
//! original.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use strata_select::tunables::bootstrap_defaults;
use strata_select::{AppDataEntry, ConfigStore, Link, PriorityRule, SelectError, Tunables};

/// On-disk layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreFile {
    #[serde(default)]
    pub appdata: Vec<AppDataEntry>,
    #[serde(default)]
    pub rules: Vec<PriorityRule>,
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// Read the file. A missing file is an empty store.
    pub async fn load(&self) -> Result<StoreFile, SelectError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "store file missing, starting empty");
                return Ok(StoreFile::default());
            }
            Err(e) => {
                return Err(SelectError::ConfigRead(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };
        toml::from_str(&text)
            .map_err(|e| SelectError::ConfigRead(format!("{}: {e}", self.path.display())))
    }

    pub async fn save(&self, file: &StoreFile) -> Result<(), SelectError> {
        let text = toml::to_string_pretty(file).map_err(|e| self.write_error(e))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }
        let tmp = self.path.with_extension("toml.tmp");
        tokio::fs::write(&tmp, text)
            .await
            .map_err(|e| self.write_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.write_error(e))
    }

    fn write_error(&self, e: impl std::fmt::Display) -> SelectError {
        SelectError::ConfigWrite(format!("{}: {e}", self.path.display()))
    }
}

impl ConfigStore for FileStore {
    async fn tunables(&self) -> Result<Tunables, SelectError> {
        let mut file = self.load().await?;
        let added = bootstrap_defaults(&mut file.appdata);
        if !added.is_empty() {
            match self.save(&file).await {
                Ok(()) => {
                    tracing::info!(path = %self.path.display(), added = added.len(), "wrote default tunables")
                }
                Err(e) => tracing::warn!(error = %e, "could not persist default tunables"),
            }
        }
        Ok(Tunables::from_entries(&file.appdata))
    }

    async fn priority_rules(&self) -> Result<Vec<PriorityRule>, SelectError> {
        Ok(self.load().await?.rules)
    }

    async fn set_priority(&self, rule: &str, priority: f64) -> Result<(), SelectError> {
        let mut file = self.load().await?;
        let target = file
            .rules
            .iter_mut()
            .find(|r| r.id == rule)
            .ok_or_else(|| SelectError::ConfigWrite(format!("no rule `{rule}`")))?;
        target.priority = priority;
        self.save(&file).await
    }

    async fn seed_rules(&self, links: &[Link]) -> Result<usize, SelectError> {
        let mut file = self.load().await?;
        if !file.rules.is_empty() {
            return Ok(0);
        }
        file.rules = PriorityRule::seed_for(links);
        if file.rules.is_empty() {
            return Ok(0);
        }
        self.save(&file).await?;
        tracing::info!(path = %self.path.display(), rules = file.rules.len(), "wrote routing-priority rules");
        Ok(file.rules.len())
    }
}
