//! Resolution, rendering support and apply services

pub mod configurator;
pub mod deserializer;
pub mod diff;
pub mod firmware;
pub mod option_resolver;
pub mod versioning;

pub use configurator::{Configurator, ConfiguratorStatus};
pub use deserializer::{
    default_configuration, resolve_full, resolve_partial, resolve_printer_defaults, Catalogs,
};
pub use diff::unified_diff;
pub use firmware::{CommandFirmwareService, FirmwareService, NoopFirmwareService};
pub use option_resolver::*;
pub use versioning::{apply, apply_artifacts, compare};
