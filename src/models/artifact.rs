//! Generated files, their change classification and apply outcomes

use serde::{Deserialize, Serialize};

use crate::{ConfigResult, ConfiguratorError};

/// One generated configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub file_name: String,
    pub content: String,
    /// Whether an existing file on disk may be replaced
    pub overwrite: bool,
    pub exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Created,
    Removed,
    Changed,
    Unchanged,
}

/// An artifact classified against the previously applied set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedArtifact {
    pub file_name: String,
    pub content: String,
    pub overwrite: bool,
    pub exists: bool,
    pub state: FileState,
    /// Unified diff; `None` for unchanged files
    pub diff: Option<String>,
}

impl VersionedArtifact {
    pub fn is_unchanged(&self) -> bool {
        self.state == FileState::Unchanged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "error", rename_all = "lowercase")]
pub enum FileAction {
    Created,
    Overwritten,
    Skipped,
    Failed(String),
}

impl FileAction {
    /// Whether the file on disk now holds new content
    pub fn wrote(&self) -> bool {
        matches!(self, FileAction::Created | FileAction::Overwritten)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FileAction::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub file_name: String,
    pub action: FileAction,
}

/// Outcome of one apply run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplyReport {
    pub results: Vec<ApplyResult>,
    /// Set when the files were written but the snapshot could not be saved
    pub snapshot_warning: Option<String>,
    /// Set when the firmware service could not be restarted after writing
    #[serde(default)]
    pub restart_warning: Option<String>,
}

impl ApplyReport {
    pub fn failed_files(&self) -> Vec<String> {
        self.results
            .iter()
            .filter(|r| r.action.is_failure())
            .map(|r| r.file_name.clone())
            .collect()
    }

    pub fn wrote_any(&self) -> bool {
        self.results.iter().any(|r| r.action.wrote())
    }

    /// Turns per-file failures into one aggregated error
    pub fn into_result(self) -> ConfigResult<Vec<ApplyResult>> {
        let files = self.failed_files();
        if files.is_empty() {
            Ok(self.results)
        } else {
            Err(ConfiguratorError::PartialApply { files })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_aggregates_failures() {
        let report = ApplyReport {
            results: vec![
                ApplyResult {
                    file_name: "configurator.cfg".to_string(),
                    action: FileAction::Overwritten,
                },
                ApplyResult {
                    file_name: "printer.cfg".to_string(),
                    action: FileAction::Failed("permission denied".to_string()),
                },
                ApplyResult {
                    file_name: "sensorless-x.cfg".to_string(),
                    action: FileAction::Failed("disk full".to_string()),
                },
            ],
            snapshot_warning: None,
            restart_warning: None,
        };
        assert!(report.wrote_any());
        match report.into_result() {
            Err(ConfiguratorError::PartialApply { files }) => {
                assert_eq!(files, vec!["printer.cfg", "sensorless-x.cfg"]);
            }
            other => panic!("expected partial apply, got {:?}", other),
        }
    }

    #[test]
    fn test_file_action_json() {
        let json = serde_json::to_string(&FileAction::Skipped).unwrap();
        assert_eq!(json, r#"{"action":"skipped"}"#);
    }
}
