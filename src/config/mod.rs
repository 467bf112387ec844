//! Settings, hardware catalog and on-disk persistence

pub mod catalog;
pub mod persistence;
pub mod settings;

pub use catalog::{
    find_entry, parse_cfg_metadata, sort_printers, CatalogCache, CatalogEntries, CatalogEntry,
    CatalogKind, CatalogSource, DirectoryCatalog, StaticCatalog,
};
pub use persistence::{ArtifactStore, Clock, PersistenceConfig};
pub use settings::{ConfiguratorSettings, DEFAULT_BACKUPS_TO_KEEP, SNAPSHOT_FILE_NAME};
