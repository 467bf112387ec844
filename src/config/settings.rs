//! Runtime settings: file locations, backup retention and firmware restart

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{ConfigResult, ConfiguratorError};

/// Number of timestamped backups kept per generated file
pub const DEFAULT_BACKUPS_TO_KEEP: usize = 5;

/// File name of the last applied configuration snapshot
pub const SNAPSHOT_FILE_NAME: &str = "last-printer-settings.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfiguratorSettings {
    /// Root of the hardware catalog (boards, printers, hotends, ...)
    pub configuration_path: PathBuf,
    /// Directory the generated Klipper files are written to
    pub klipper_config_path: PathBuf,
    /// Directory holding the last applied snapshot
    pub data_dir: PathBuf,
    pub backups_to_keep: usize,
    /// Shell command restarting the firmware service after an apply
    pub restart_command: Option<String>,
}

impl Default for ConfiguratorSettings {
    fn default() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let printer_data = home_dir.join("printer_data");
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| home_dir.join(".local").join("share"))
            .join("printer-configurator");

        Self {
            configuration_path: printer_data.join("config").join("configurator"),
            klipper_config_path: printer_data.join("config"),
            data_dir,
            backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
            restart_command: None,
        }
    }
}

impl ConfiguratorSettings {
    /// Defaults, overlaid by the optional settings file, overlaid by the environment
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.with_env_overrides()
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfiguratorError::io(path, e))?;
        let settings: Self = toml::from_str(&content).map_err(|e| {
            ConfiguratorError::Configuration(format!(
                "Invalid settings file {}: {}",
                path.display(),
                e
            ))
        })?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply `CONFIGURATOR_*` environment overrides
    pub fn with_env_overrides(mut self) -> ConfigResult<Self> {
        if let Ok(path) = std::env::var("CONFIGURATOR_CONFIGURATION_PATH") {
            self.configuration_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("CONFIGURATOR_KLIPPER_CONFIG_PATH") {
            self.klipper_config_path = PathBuf::from(path);
        }

        if let Ok(path) = std::env::var("CONFIGURATOR_DATA_DIR") {
            self.data_dir = PathBuf::from(path);
        }

        if let Ok(count) = std::env::var("CONFIGURATOR_BACKUPS_TO_KEEP") {
            self.backups_to_keep = count.trim().parse().map_err(|_| {
                ConfiguratorError::Configuration(format!(
                    "CONFIGURATOR_BACKUPS_TO_KEEP must be a number, got '{}'",
                    count
                ))
            })?;
        }

        if let Ok(command) = std::env::var("CONFIGURATOR_RESTART_COMMAND") {
            let command = command.trim().to_string();
            self.restart_command = if command.is_empty() { None } else { Some(command) };
        }

        Ok(self)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE_NAME)
    }

    /// Settings rooted in one directory, used by tests and embedding callers
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            configuration_path: root.join("catalog"),
            klipper_config_path: root.join("config"),
            data_dir: root.join("data"),
            backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
            restart_command: None,
        }
    }
}
