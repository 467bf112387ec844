//! On-disk state: generated files, their backups and the last applied snapshot

use chrono::{Duration, Local, NaiveDateTime};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::settings::ConfiguratorSettings;
use crate::models::SerializedPrinterConfiguration;
use crate::{ConfigResult, ConfiguratorError};

/// Timestamp layout embedded in backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Source of backup timestamps
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct PersistenceConfig {
    /// Directory generated files and their backups live in
    pub config_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub max_backups: usize,
}

impl From<&ConfiguratorSettings> for PersistenceConfig {
    fn from(settings: &ConfiguratorSettings) -> Self {
        Self {
            config_dir: settings.klipper_config_path.clone(),
            snapshot_path: settings.snapshot_path(),
            max_backups: settings.backups_to_keep,
        }
    }
}

#[derive(Clone)]
pub struct ArtifactStore {
    config: PersistenceConfig,
    clock: Clock,
}

impl fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("config", &self.config)
            .finish()
    }
}

impl ArtifactStore {
    pub fn new(config: PersistenceConfig) -> Self {
        Self {
            config,
            clock: Arc::new(|| Local::now().naive_local()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.config.config_dir.join(file_name)
    }

    /// Whether a generated file is on disk; unreadable locations are errors
    pub async fn exists(&self, file_name: &str) -> ConfigResult<bool> {
        path_exists(&self.path_for(file_name)).await
    }

    /// Current content of a generated file, `None` when it is not on disk
    pub async fn read(&self, file_name: &str) -> ConfigResult<Option<String>> {
        let path = self.path_for(file_name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfiguratorError::io(path, e)),
        }
    }

    /// Copies an existing file to `<stem>-<YYYYMMDD_HHMMSS>.cfg` next to it
    pub async fn backup_file(&self, file_name: &str) -> ConfigResult<Option<PathBuf>> {
        let path = self.path_for(file_name);
        if !self.exists(file_name).await? {
            return Ok(None);
        }

        let stem = file_stem(file_name);
        let mut timestamp = (self.clock)();
        let mut backup_path = self.path_for(&backup_file_name(stem, timestamp));
        while path_exists(&backup_path).await? {
            timestamp += Duration::seconds(1);
            backup_path = self.path_for(&backup_file_name(stem, timestamp));
        }

        tokio::fs::copy(&path, &backup_path)
            .await
            .map_err(|e| ConfiguratorError::io(&backup_path, e))?;

        debug!("Backed up {} to {}", file_name, backup_path.display());
        Ok(Some(backup_path))
    }

    /// Deletes the oldest backups of `file_name` beyond the retention count
    pub async fn prune_backups(&self, file_name: &str) -> ConfigResult<Vec<PathBuf>> {
        let mut backups = self.list_backups(file_name).await?;
        let mut removed = Vec::new();
        if backups.len() <= self.config.max_backups {
            return Ok(removed);
        }

        // Newest first; equal timestamps fall back to the name
        backups.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        for (_, old_backup) in backups.into_iter().skip(self.config.max_backups) {
            tokio::fs::remove_file(&old_backup)
                .await
                .map_err(|e| ConfiguratorError::io(&old_backup, e))?;
            removed.push(old_backup);
        }

        info!("Removed {} old backups of {}", removed.len(), file_name);
        Ok(removed)
    }

    /// Backups of `file_name` with their embedded timestamps, unordered
    pub async fn list_backups(&self, file_name: &str) -> ConfigResult<Vec<(NaiveDateTime, PathBuf)>> {
        let pattern = backup_pattern(file_stem(file_name))?;
        let dir = &self.config.config_dir;

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ConfiguratorError::io(dir, e)),
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ConfiguratorError::io(dir, e))?
        {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(captures) = pattern.captures(name) else {
                continue;
            };
            match NaiveDateTime::parse_from_str(&captures[1], BACKUP_TIMESTAMP_FORMAT) {
                Ok(timestamp) => backups.push((timestamp, path)),
                Err(_) => warn!("Ignoring backup with invalid timestamp: {}", name),
            }
        }
        Ok(backups)
    }

    /// Writes through a temporary file and a rename
    pub async fn write_file_atomic(&self, file_name: &str, content: &str) -> ConfigResult<()> {
        write_atomic(&self.path_for(file_name), content).await
    }

    pub async fn save_snapshot(&self, snapshot: &SerializedPrinterConfiguration) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ConfiguratorError::SnapshotPersist(e.to_string()))?;
        write_atomic(&self.config.snapshot_path, &content).await
    }

    /// The last applied configuration, `None` before the first apply
    pub async fn load_snapshot(&self) -> ConfigResult<Option<SerializedPrinterConfiguration>> {
        let path = &self.config.snapshot_path;
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfiguratorError::io(path, e)),
        };

        serde_json::from_str(&content).map(Some).map_err(|e| {
            ConfiguratorError::Validation(format!(
                "Invalid snapshot {}: {}",
                path.display(),
                e
            ))
        })
    }
}

async fn write_atomic(path: &Path, content: &str) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ConfiguratorError::io(parent, e))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    tokio::fs::write(&temp_path, content)
        .await
        .map_err(|e| ConfiguratorError::io(&temp_path, e))?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(ConfiguratorError::io(path, e));
    }
    Ok(())
}

/// `printer.cfg` -> `printer`
pub fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

pub fn backup_file_name(stem: &str, timestamp: NaiveDateTime) -> String {
    format!("{}-{}.cfg", stem, timestamp.format(BACKUP_TIMESTAMP_FORMAT))
}

fn backup_pattern(stem: &str) -> ConfigResult<Regex> {
    Regex::new(&format!(r"^{}-(\d{{8}}_\d{{6}})\.cfg$", regex::escape(stem)))
        .map_err(|e| ConfiguratorError::Configuration(format!("Invalid backup pattern: {}", e)))
}

async fn path_exists(path: &Path) -> ConfigResult<bool> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| ConfiguratorError::io(path, e))
}
