//! Command-line interface for the printer configurator
//!
//! Every command reads stored (ID-only) configurations from JSON files and
//! prints either a human readable summary or, with `--json`, the full result.

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::config::CatalogKind;
use crate::models::{
    ApplyReport, FileAction, FileState, SerializedPartialPrinterConfiguration,
    SerializedPrinterConfiguration, ToolSelector,
};
use crate::services::{Configurator, OptionQuery};
use crate::{ConfiguratorError, Result};

/// Manufacturer whose printers are listed first
pub const DEFAULT_MANUFACTURER: &str = "Rat Rig";

#[derive(Parser, Debug)]
#[command(name = "printer-configurator")]
#[command(about = "Resolves printer hardware selections and renders Klipper configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ConfiguratorCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Settings file path
    #[arg(short, long, global = true)]
    pub settings: Option<PathBuf>,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List supported printers
    Printers {
        /// Manufacturer listed first
        #[arg(long, default_value = DEFAULT_MANUFACTURER)]
        manufacturer: String,
    },

    /// List a hardware catalog (boards, hotends, extruders, probes, printers)
    Catalog {
        kind: CatalogKind,
    },

    /// Compute the selectable values of one field
    Options {
        /// x-endstop, y-endstop, part-fan, hotend-fan, controller-fan,
        /// x-accelerometer or y-accelerometer
        query: OptionQuery,

        /// Partial configuration JSON file
        config: PathBuf,

        /// Toolhead by number (T0, 1) or carriage (x, dual-carriage)
        #[arg(short, long, default_value = "T0")]
        tool: ToolSelector,
    },

    /// Resolve a stored configuration against the catalog
    Resolve {
        config: PathBuf,

        /// Best-effort resolution that drops unknown references
        #[arg(long)]
        partial: bool,
    },

    /// Render configuration files without writing them
    Render {
        config: PathBuf,

        /// Auxiliary files to mark for overwrite, `*` for all
        #[arg(long)]
        overwrite: Vec<String>,
    },

    /// Show what applying a configuration would change
    Compare {
        config: PathBuf,

        #[arg(long)]
        overwrite: Vec<String>,
    },

    /// Write the configuration files and restart the firmware
    Apply {
        config: PathBuf,

        /// Auxiliary files to overwrite, `*` for all
        #[arg(long)]
        overwrite: Vec<String>,

        /// Files to leave untouched
        #[arg(long)]
        skip: Vec<String>,
    },

    /// Re-apply the last applied configuration
    Regenerate {
        #[arg(long)]
        overwrite: Vec<String>,

        #[arg(long)]
        skip: Vec<String>,
    },

    /// Show the state of the generated files
    Status,
}

/// CLI command executor
pub struct CliExecutor {
    configurator: Configurator,
    json_output: bool,
}

impl CliExecutor {
    pub fn new(configurator: Configurator, json_output: bool) -> Self {
        Self {
            configurator,
            json_output,
        }
    }

    pub async fn execute(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Printers { manufacturer } => {
                let printers = self.configurator.printers(&manufacturer).await?;
                if self.json_output {
                    return print_json(&printers);
                }
                if printers.is_empty() {
                    println!("No printers found.");
                }
                for printer in printers {
                    println!(
                        "  {} - {} ({}, sizes {:?})",
                        printer.id, printer.name, printer.manufacturer, printer.sizes
                    );
                }
            }
            Commands::Catalog { kind } => {
                let entries = self.configurator.catalog(kind).await?;
                if self.json_output {
                    println!("{}", serde_json::to_string_pretty(&entries.to_json()?)?);
                } else {
                    println!("{} ({}):", kind, entries.len());
                    for id in entries.ids() {
                        println!("  {}", id);
                    }
                }
            }
            Commands::Options {
                query,
                config,
                tool,
            } => {
                let serialized: SerializedPartialPrinterConfiguration = read_json(&config).await?;
                let options = self.configurator.options(query, &serialized, tool).await?;
                if self.json_output {
                    return print_json(&options);
                }
                println!("{} options:", query);
                for (id, title) in options.entries() {
                    println!("  {} - {}", id, title);
                }
            }
            Commands::Resolve { config, partial } => {
                if partial {
                    let serialized: SerializedPartialPrinterConfiguration =
                        read_json(&config).await?;
                    let resolved = self.configurator.resolve_partial(&serialized).await?;
                    if self.json_output {
                        return print_json(&resolved);
                    }
                    print_json(&resolved.serialize())?;
                } else {
                    let serialized: SerializedPrinterConfiguration = read_json(&config).await?;
                    let resolved = self.configurator.resolve_full(&serialized).await?;
                    if self.json_output {
                        return print_json(&resolved);
                    }
                    println!(
                        "{} {} on {} with {} toolhead(s) and {} rails",
                        resolved.printer.name,
                        resolved.size,
                        resolved.controlboard.name,
                        resolved.toolheads.len(),
                        resolved.rails.len()
                    );
                }
            }
            Commands::Render { config, overwrite } => {
                let serialized: SerializedPrinterConfiguration = read_json(&config).await?;
                let artifacts = self.configurator.render(&serialized, &overwrite).await?;
                if self.json_output {
                    return print_json(&artifacts);
                }
                for artifact in artifacts {
                    println!(
                        "### {} (exists: {}, overwrite: {})",
                        artifact.file_name, artifact.exists, artifact.overwrite
                    );
                    println!("{}", artifact.content);
                }
            }
            Commands::Compare { config, overwrite } => {
                let serialized: SerializedPrinterConfiguration = read_json(&config).await?;
                let versioned = self
                    .configurator
                    .compare_with_snapshot(&serialized, &overwrite)
                    .await?;
                if self.json_output {
                    return print_json(&versioned);
                }
                for file in versioned {
                    let state = match file.state {
                        FileState::Created => "created",
                        FileState::Removed => "removed",
                        FileState::Changed => "changed",
                        FileState::Unchanged => "unchanged",
                    };
                    println!("{:>9}  {}", state, file.file_name);
                    if let Some(diff) = file.diff.filter(|d| !d.is_empty()) {
                        println!("{}", diff);
                    }
                }
            }
            Commands::Apply {
                config,
                overwrite,
                skip,
            } => {
                let serialized: SerializedPrinterConfiguration = read_json(&config).await?;
                info!("Applying configuration for {}", serialized.printer);
                let report = self
                    .configurator
                    .apply(&serialized, &overwrite, &skip)
                    .await?;
                self.finish_apply(report)?;
            }
            Commands::Regenerate { overwrite, skip } => {
                let report = self.configurator.regenerate(&overwrite, &skip).await?;
                self.finish_apply(report)?;
            }
            Commands::Status => {
                let status = self.configurator.status().await?;
                if self.json_output {
                    return print_json(&status);
                }
                println!("Config directory:  {}", status.config_dir.display());
                println!("Catalog directory: {}", status.catalog_dir.display());
                println!(
                    "printer.cfg:       {}",
                    match (status.base_file_exists, status.base_initialized) {
                        (false, _) => "missing",
                        (true, false) => "first-run",
                        (true, true) => "initialized",
                    }
                );
                match status.last_applied {
                    Some(snapshot) => println!("Last applied:      {}", snapshot.printer),
                    None => println!("Last applied:      never"),
                }
            }
        }

        Ok(())
    }

    /// Prints the report and fails when any file failed
    fn finish_apply(&self, report: ApplyReport) -> Result<()> {
        if self.json_output {
            print_json(&report)?;
        } else {
            for result in &report.results {
                let action = match &result.action {
                    FileAction::Created => "created".to_string(),
                    FileAction::Overwritten => "overwritten".to_string(),
                    FileAction::Skipped => "skipped".to_string(),
                    FileAction::Failed(e) => format!("failed: {}", e),
                };
                println!("  {} - {}", result.file_name, action);
            }
            for warning in report
                .snapshot_warning
                .iter()
                .chain(report.restart_warning.iter())
            {
                println!("Warning: {}", warning);
            }
        }
        report.into_result()?;
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    debug!("Reading {}", path.display());
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfiguratorError::io(path, e))?;
    let value = serde_json::from_str(&content).map_err(|e| {
        ConfiguratorError::Validation(format!("Invalid configuration {}: {}", path.display(), e))
    })?;
    Ok(value)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Runs one command; errors are printed (as a JSON envelope with `--json`)
/// and turned into exit code 1
pub async fn run_cli(cli: ConfiguratorCli, configurator: Configurator) -> i32 {
    if cli.verbose {
        debug!("Verbose output enabled");
    }

    let json = cli.json;
    let executor = CliExecutor::new(configurator, json);
    match executor.execute(cli.command).await {
        Ok(()) => 0,
        Err(e) => {
            report_error(&e, json);
            1
        }
    }
}

pub fn report_error(e: &anyhow::Error, json: bool) {
    if json {
        let error_json = serde_json::json!({
            "error": true,
            "message": e.to_string()
        });
        match serde_json::to_string_pretty(&error_json) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{{\"error\": true}}"),
        }
    } else {
        error!("Command failed: {}", e);
        eprintln!("Error: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolAxis;

    #[test]
    fn test_cli_parsing() {
        let cli = ConfiguratorCli::try_parse_from(["printer-configurator", "printers"]).unwrap();
        match cli.command {
            Commands::Printers { manufacturer } => assert_eq!(manufacturer, DEFAULT_MANUFACTURER),
            _ => panic!("Expected Printers command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = ConfiguratorCli::try_parse_from([
            "printer-configurator",
            "status",
            "--verbose",
            "--json",
            "--settings",
            "/etc/configurator.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.json);
        assert_eq!(cli.settings, Some(PathBuf::from("/etc/configurator.toml")));
    }

    #[test]
    fn test_options_command() {
        let cli = ConfiguratorCli::try_parse_from([
            "printer-configurator",
            "options",
            "x_endstop",
            "config.json",
            "--tool",
            "dual-carriage",
        ])
        .unwrap();
        match cli.command {
            Commands::Options { query, tool, .. } => {
                assert_eq!(query, OptionQuery::XEndstop);
                assert_eq!(tool, ToolSelector::Axis(ToolAxis::DualCarriage));
            }
            _ => panic!("Expected Options command"),
        }

        assert!(ConfiguratorCli::try_parse_from([
            "printer-configurator",
            "options",
            "nozzle",
            "config.json"
        ])
        .is_err());
    }

    #[test]
    fn test_apply_collects_file_lists() {
        let cli = ConfiguratorCli::try_parse_from([
            "printer-configurator",
            "apply",
            "config.json",
            "--overwrite",
            "sensorless-x.cfg",
            "--overwrite",
            "sensorless-y.cfg",
            "--skip",
            "printer.cfg",
        ])
        .unwrap();
        match cli.command {
            Commands::Apply {
                overwrite, skip, ..
            } => {
                assert_eq!(overwrite, vec!["sensorless-x.cfg", "sensorless-y.cfg"]);
                assert_eq!(skip, vec!["printer.cfg"]);
            }
            _ => panic!("Expected Apply command"),
        }
    }

    #[test]
    fn test_catalog_kind_argument() {
        let cli =
            ConfiguratorCli::try_parse_from(["printer-configurator", "catalog", "z-probe"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Catalog {
                kind: CatalogKind::Probes
            }
        ));
    }
}
