//! Printer Configurator - hardware resolution and Klipper config generation
//!
//! Turns a partially specified, ID-based printer hardware selection into a
//! validated configuration, renders it into Klipper configuration files and
//! applies those files to disk with backups and a last-applied snapshot.

pub mod cli;
pub mod config;
pub mod data;
pub mod generator;
pub mod logging;
pub mod models;
pub mod services;

pub use models::*;
pub use services::*;

use std::path::PathBuf;

/// Result type alias for application-level operations
pub type Result<T> = anyhow::Result<T>;

/// Result type for library operations with a typed failure
pub type ConfigResult<T> = std::result::Result<T, ConfiguratorError>;

/// Kind of catalog or table entry an ID refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    Printer,
    Controlboard,
    Toolboard,
    Hotend,
    Extruder,
    Probe,
    Thermistor,
    Driver,
    Stepper,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ReferenceKind::Printer => "printer",
            ReferenceKind::Controlboard => "controlboard",
            ReferenceKind::Toolboard => "toolboard",
            ReferenceKind::Hotend => "hotend",
            ReferenceKind::Extruder => "extruder",
            ReferenceKind::Probe => "probe",
            ReferenceKind::Thermistor => "thermistor",
            ReferenceKind::Driver => "driver",
            ReferenceKind::Stepper => "stepper",
        };
        f.write_str(name)
    }
}

/// Error types specific to configurator operations
#[derive(thiserror::Error, Debug)]
pub enum ConfiguratorError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unresolved {kind} reference: {id}")]
    UnresolvedReference { kind: ReferenceKind, id: String },

    #[error("Inconsistent hardware: {0}")]
    InconsistentHardware(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't persist the last applied settings, but the configuration files were generated: {0}")]
    SnapshotPersist(String),

    #[error("The following files couldn't be written: {}", files.join(", "))]
    PartialApply { files: Vec<String> },

    #[error("No template registered for printer template '{0}'")]
    TemplateNotFound(String),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ConfiguratorError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfiguratorError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unresolved(kind: ReferenceKind, id: impl Into<String>) -> Self {
        ConfiguratorError::UnresolvedReference {
            kind,
            id: id.into(),
        }
    }
}
