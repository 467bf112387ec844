//! Entry point tying the catalog, resolution, rendering and apply together

use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::deserializer::{resolve_full, resolve_partial, resolve_printer_defaults};
use super::firmware::{CommandFirmwareService, FirmwareService, NoopFirmwareService};
use super::option_resolver::OptionQuery;
use super::versioning;
use crate::config::{
    sort_printers, ArtifactStore, CatalogCache, CatalogEntries, CatalogKind, ConfiguratorSettings,
    PersistenceConfig,
};
use crate::generator::{is_base_initialized, Generator, BASE_FILE};
use crate::models::{
    ApplyReport, Artifact, PartialPrinterConfiguration, PrinterConfiguration, PrinterDefinition,
    ResolvedOptions, SerializedPartialPrinterConfiguration, SerializedPrinterConfiguration,
    ToolSelector, VersionedArtifact,
};
use crate::{ConfigResult, ConfiguratorError};

/// State of the generated configuration on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfiguratorStatus {
    pub config_dir: PathBuf,
    pub catalog_dir: PathBuf,
    pub snapshot_path: PathBuf,
    pub base_file_exists: bool,
    pub base_initialized: bool,
    pub last_applied: Option<SerializedPrinterConfiguration>,
}

pub struct Configurator {
    settings: ConfiguratorSettings,
    catalog: CatalogCache,
    generator: Generator,
    store: ArtifactStore,
    firmware: Arc<dyn FirmwareService>,
}

impl Configurator {
    /// Wires the on-disk catalog, store and restart command from `settings`
    pub fn new(settings: ConfiguratorSettings) -> ConfigResult<Self> {
        let catalog = CatalogCache::from_directory(&settings.configuration_path);
        let store = ArtifactStore::new(PersistenceConfig::from(&settings));
        let firmware: Arc<dyn FirmwareService> = match &settings.restart_command {
            Some(command) => Arc::new(CommandFirmwareService::new(command.clone())),
            None => Arc::new(NoopFirmwareService),
        };
        Self::with_parts(settings, catalog, store, firmware)
    }

    pub fn with_parts(
        settings: ConfiguratorSettings,
        catalog: CatalogCache,
        store: ArtifactStore,
        firmware: Arc<dyn FirmwareService>,
    ) -> ConfigResult<Self> {
        Ok(Self {
            settings,
            catalog,
            generator: Generator::new()?,
            store,
            firmware,
        })
    }

    pub fn settings(&self) -> &ConfiguratorSettings {
        &self.settings
    }

    pub fn catalog_cache(&self) -> &CatalogCache {
        &self.catalog
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub async fn resolve_partial(
        &self,
        serialized: &SerializedPartialPrinterConfiguration,
    ) -> ConfigResult<PartialPrinterConfiguration> {
        resolve_partial(serialized, &self.catalog).await
    }

    pub async fn resolve_full(
        &self,
        serialized: &SerializedPrinterConfiguration,
    ) -> ConfigResult<PrinterConfiguration> {
        resolve_full(serialized, &self.catalog).await
    }

    pub async fn printer_defaults(&self, printer_id: &str) -> ConfigResult<PrinterConfiguration> {
        resolve_printer_defaults(printer_id, &self.catalog).await
    }

    /// Options of one field for the toolhead picked by `selector`
    pub async fn options(
        &self,
        query: OptionQuery,
        serialized: &SerializedPartialPrinterConfiguration,
        selector: ToolSelector,
    ) -> ConfigResult<ResolvedOptions> {
        let partial = self.resolve_partial(serialized).await?;
        Ok(query.resolve(&partial, partial.toolhead(selector)))
    }

    pub async fn render(
        &self,
        serialized: &SerializedPrinterConfiguration,
        overwrite_files: &[String],
    ) -> ConfigResult<Vec<Artifact>> {
        let config = self.resolve_full(serialized).await?;
        let artifacts = crate::trace_performance!("render", {
            self.generator
                .render(&config, &self.store, overwrite_files)
                .await?
        });
        Ok(artifacts)
    }

    pub async fn compare(
        &self,
        old: Option<&PrinterConfiguration>,
        new: &PrinterConfiguration,
        overwrite_files: &[String],
    ) -> ConfigResult<Vec<VersionedArtifact>> {
        versioning::compare(old, new, &self.generator, &self.store, overwrite_files).await
    }

    /// Compares against the last applied snapshot; a snapshot that no
    /// longer resolves counts as no previous configuration
    #[instrument(skip_all)]
    pub async fn compare_with_snapshot(
        &self,
        serialized: &SerializedPrinterConfiguration,
        overwrite_files: &[String],
    ) -> ConfigResult<Vec<VersionedArtifact>> {
        let new = self.resolve_full(serialized).await?;
        let old = match self.store.load_snapshot().await? {
            Some(snapshot) => match self.resolve_full(&snapshot).await {
                Ok(old) => Some(old),
                Err(e) => {
                    warn!("Last applied configuration no longer resolves: {}", e);
                    None
                }
            },
            None => None,
        };
        self.compare(old.as_ref(), &new, overwrite_files).await
    }

    /// Resolves, writes and restarts the firmware when any file changed on disk
    #[instrument(skip_all, fields(printer = %serialized.printer))]
    pub async fn apply(
        &self,
        serialized: &SerializedPrinterConfiguration,
        overwrite_files: &[String],
        skip_files: &[String],
    ) -> ConfigResult<ApplyReport> {
        let config = self.resolve_full(serialized).await?;
        let mut report = crate::trace_performance!("apply", {
            versioning::apply(
                &config,
                &self.generator,
                &self.store,
                overwrite_files,
                skip_files,
            )
            .await?
        });

        if report.wrote_any() {
            if let Err(e) = self.firmware.restart().await {
                warn!("Firmware restart failed: {}", e);
                report.restart_warning = Some(e.to_string());
            }
        } else {
            debug!("Nothing written, firmware restart skipped");
        }

        info!(
            "Applied {} files, {} failed",
            report.results.len(),
            report.failed_files().len()
        );
        Ok(report)
    }

    /// Re-applies the last applied configuration
    pub async fn regenerate(
        &self,
        overwrite_files: &[String],
        skip_files: &[String],
    ) -> ConfigResult<ApplyReport> {
        let snapshot = self.store.load_snapshot().await?.ok_or_else(|| {
            ConfiguratorError::Configuration(
                "No configuration has been applied yet, nothing to regenerate".to_string(),
            )
        })?;
        self.apply(&snapshot, overwrite_files, skip_files).await
    }

    /// Printer definitions with `preferred_manufacturer`'s models first
    pub async fn printers(
        &self,
        preferred_manufacturer: &str,
    ) -> ConfigResult<Vec<PrinterDefinition>> {
        let mut printers = self.catalog.printers().await?.as_ref().clone();
        sort_printers(&mut printers, preferred_manufacturer);
        Ok(printers)
    }

    pub async fn catalog(&self, kind: CatalogKind) -> ConfigResult<CatalogEntries> {
        self.catalog.get(kind).await
    }

    pub async fn status(&self) -> ConfigResult<ConfiguratorStatus> {
        let base = self.store.read(BASE_FILE).await?;
        Ok(ConfiguratorStatus {
            config_dir: self.store.config().config_dir.clone(),
            catalog_dir: self.settings.configuration_path.clone(),
            snapshot_path: self.store.config().snapshot_path.clone(),
            base_file_exists: base.is_some(),
            base_initialized: base.as_deref().map_or(false, is_base_initialized),
            last_applied: self.store.load_snapshot().await?,
        })
    }
}
