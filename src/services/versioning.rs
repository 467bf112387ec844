//! Change classification between applied and newly rendered files, and the
//! on-disk apply with backups

use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

use super::diff::unified_diff;
use crate::config::ArtifactStore;
use crate::generator::{Generator, RenderedFile};
use crate::models::{
    ApplyReport, ApplyResult, Artifact, FileAction, FileState, PrinterConfiguration,
    VersionedArtifact,
};
use crate::{ConfigResult, ConfiguratorError};

/// Classifies the files of `new` against those rendered from `old`.
///
/// Files of the new set keep their render order; files only the old set
/// produced follow as removed, in their old order.
#[instrument(skip_all)]
pub async fn compare(
    old: Option<&PrinterConfiguration>,
    new: &PrinterConfiguration,
    generator: &Generator,
    store: &ArtifactStore,
    overwrite_files: &[String],
) -> ConfigResult<Vec<VersionedArtifact>> {
    let old_files = match old {
        Some(config) => generator.render_files(config)?,
        None => Vec::new(),
    };
    let new_artifacts = generator.render(new, store, overwrite_files).await?;

    let mut versioned = Vec::with_capacity(new_artifacts.len() + old_files.len());
    for artifact in &new_artifacts {
        let previous = old_files.iter().find(|f| f.file_name == artifact.file_name);
        let (state, diff) = match previous {
            None => (
                FileState::Created,
                Some(unified_diff(&artifact.file_name, None, Some(&artifact.content))),
            ),
            Some(file) if file.content == artifact.content => (FileState::Unchanged, None),
            Some(file) => (
                FileState::Changed,
                Some(unified_diff(
                    &artifact.file_name,
                    Some(&file.content),
                    Some(&artifact.content),
                )),
            ),
        };
        versioned.push(VersionedArtifact {
            file_name: artifact.file_name.clone(),
            content: artifact.content.clone(),
            overwrite: artifact.overwrite,
            exists: artifact.exists,
            state,
            diff,
        });
    }

    let new_names: HashSet<&str> = new_artifacts.iter().map(|a| a.file_name.as_str()).collect();
    for RenderedFile { file_name, content } in old_files {
        if new_names.contains(file_name.as_str()) {
            continue;
        }
        let exists = store.exists(&file_name).await?;
        let diff = unified_diff(&file_name, Some(&content), None);
        versioned.push(VersionedArtifact {
            file_name,
            content,
            overwrite: false,
            exists,
            state: FileState::Removed,
            diff: Some(diff),
        });
    }

    debug!(
        "Compared {} files, {} changed",
        versioned.len(),
        versioned.iter().filter(|v| !v.is_unchanged()).count()
    );
    Ok(versioned)
}

/// Writes artifacts to disk; every file is handled independently.
pub async fn apply_artifacts(
    artifacts: &[Artifact],
    store: &ArtifactStore,
    skip_files: &[String],
) -> Vec<ApplyResult> {
    let tasks = artifacts.iter().map(|artifact| async move {
        let skip = skip_files.iter().any(|f| *f == artifact.file_name);
        let action = apply_artifact(artifact, store, skip).await;
        ApplyResult {
            file_name: artifact.file_name.clone(),
            action,
        }
    });
    join_all(tasks).await
}

async fn apply_artifact(artifact: &Artifact, store: &ArtifactStore, skip: bool) -> FileAction {
    let name = &artifact.file_name;
    if skip {
        debug!("Skipping {} on request", name);
        return FileAction::Skipped;
    }
    if artifact.exists && !artifact.overwrite {
        debug!("Keeping existing {}", name);
        return FileAction::Skipped;
    }

    if artifact.exists {
        if let Err(e) = store.backup_file(name).await {
            warn!("Backup of {} failed: {}", name, e);
            return FileAction::Failed(e.to_string());
        }
        if let Err(e) = store.prune_backups(name).await {
            warn!("Pruning backups of {} failed: {}", name, e);
        }
    }

    match store.write_file_atomic(name, &artifact.content).await {
        Ok(()) if artifact.exists => {
            info!("Overwrote {}", name);
            FileAction::Overwritten
        }
        Ok(()) => {
            info!("Created {}", name);
            FileAction::Created
        }
        Err(e) => {
            warn!("Writing {} failed: {}", name, e);
            FileAction::Failed(e.to_string())
        }
    }
}

/// Renders, writes and, when every file landed, records the configuration
/// as the last applied one.
#[instrument(skip_all, fields(printer = %config.printer.id))]
pub async fn apply(
    config: &PrinterConfiguration,
    generator: &Generator,
    store: &ArtifactStore,
    overwrite_files: &[String],
    skip_files: &[String],
) -> ConfigResult<ApplyReport> {
    let artifacts = generator.render(config, store, overwrite_files).await?;
    let results = apply_artifacts(&artifacts, store, skip_files).await;
    let mut report = ApplyReport {
        results,
        ..ApplyReport::default()
    };

    let failed = report.failed_files();
    if !failed.is_empty() {
        warn!("Not updating the snapshot, failed files: {}", failed.join(", "));
        return Ok(report);
    }

    if let Err(e) = store.save_snapshot(&config.serialize()).await {
        let warning = ConfiguratorError::SnapshotPersist(e.to_string()).to_string();
        warn!("{}", warning);
        report.snapshot_warning = Some(warning);
    }
    Ok(report)
}
