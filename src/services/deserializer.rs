//! Turns stored ID-only configuration into resolved configuration objects

use futures::future::join_all;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::option_resolver::{
    controller_fan_options, default_accelerometer, hotend_fan_options, part_fan_options,
    x_accelerometer_options, x_endstop_options, y_accelerometer_options, y_endstop_options,
};
use crate::config::{find_entry, CatalogCache};
use crate::data;
use crate::models::{
    default_tool_axis, validate_rail_axes, validate_toolhead_layout, Board, BuildSize, Extruder,
    Hotend, PartialPrinterConfiguration, PartialToolheadConfiguration, PrinterConfiguration,
    PrinterDefinition, Probe, Rail, SerializedPartialPrinterConfiguration,
    SerializedPartialToolheadConfiguration, SerializedPrinterConfiguration, SerializedRail,
    SerializedToolheadConfiguration, ToolheadConfiguration,
};
use crate::{ConfigResult, ConfiguratorError, ReferenceKind};

/// All catalog categories, fetched together before resolution starts
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub boards: Arc<Vec<Board>>,
    pub hotends: Arc<Vec<Hotend>>,
    pub extruders: Arc<Vec<Extruder>>,
    pub probes: Arc<Vec<Probe>>,
    pub printers: Arc<Vec<PrinterDefinition>>,
}

impl Catalogs {
    pub async fn fetch(cache: &CatalogCache) -> ConfigResult<Self> {
        let (boards, hotends, extruders, probes, printers) = tokio::try_join!(
            cache.boards(),
            cache.hotends(),
            cache.extruders(),
            cache.probes(),
            cache.printers()
        )?;
        Ok(Self {
            boards,
            hotends,
            extruders,
            probes,
            printers,
        })
    }

    pub fn controlboard(&self, id: &str) -> Option<&Board> {
        find_entry(&self.boards, id).filter(|board| !board.is_toolboard)
    }

    pub fn toolboard(&self, id: &str) -> Option<&Board> {
        find_entry(&self.boards, id).filter(|board| board.is_toolboard)
    }
}

/// Best-effort resolution; unknown IDs and invalid selections are dropped
#[instrument(skip_all, fields(printer = ?serialized.printer))]
pub async fn resolve_partial(
    serialized: &SerializedPartialPrinterConfiguration,
    cache: &CatalogCache,
) -> ConfigResult<PartialPrinterConfiguration> {
    let catalogs = Catalogs::fetch(cache).await?;

    let printer = serialized
        .printer
        .as_deref()
        .and_then(|id| find_entry(&catalogs.printers, id))
        .cloned();

    let size = match (&printer, serialized.size) {
        (Some(printer), Some(size)) if printer.supports_size(size) => Some(BuildSize::cube(size)),
        (Some(printer), _) => printer.default_size(),
        (None, size) => size.map(BuildSize::cube),
    };

    let controlboard = serialized
        .controlboard
        .as_deref()
        .and_then(|id| catalogs.controlboard(id))
        .cloned();

    let mut config = PartialPrinterConfiguration {
        printer,
        size,
        controlboard,
        toolheads: Vec::new(),
        rails: serialized.rails.iter().filter_map(|rail| resolve_rail(rail).ok()).collect(),
        controller_fan: None,
        performance_mode: serialized.performance_mode,
        stealthchop: serialized.stealthchop,
        standstill_stealth: serialized.standstill_stealth,
    };

    config.controller_fan = serialized
        .controller_fan
        .filter(|fan| controller_fan_options(&config).contains(fan));

    // Unnumbered toolheads past tool 255 have no tool number and are dropped
    let toolheads = join_all(
        serialized
            .toolheads
            .iter()
            .enumerate()
            .filter_map(|(index, toolhead)| {
                let tool_number = toolhead.tool.or_else(|| u8::try_from(index).ok())?;
                Some(resolve_partial_toolhead(tool_number, toolhead, &catalogs, &config))
            }),
    )
    .await;
    config.toolheads = toolheads;

    debug!(
        "Resolved partial configuration with {} toolheads",
        config.toolheads.len()
    );
    Ok(config)
}

async fn resolve_partial_toolhead(
    tool_number: u8,
    serialized: &SerializedPartialToolheadConfiguration,
    catalogs: &Catalogs,
    config: &PartialPrinterConfiguration,
) -> PartialToolheadConfiguration {
    let hotend = serialized
        .hotend
        .as_deref()
        .and_then(|id| find_entry(&catalogs.hotends, id))
        .cloned();
    let thermistor = serialized
        .thermistor
        .clone()
        .or_else(|| hotend.as_ref().map(|h| h.thermistor.clone()))
        .filter(|name| data::is_known_thermistor(name));

    let mut toolhead = PartialToolheadConfiguration {
        tool_number,
        axis: serialized.axis.unwrap_or_else(|| default_tool_axis(tool_number)),
        extruder: serialized
            .extruder
            .as_deref()
            .and_then(|id| find_entry(&catalogs.extruders, id))
            .cloned(),
        probe: serialized
            .probe
            .as_deref()
            .and_then(|id| find_entry(&catalogs.probes, id))
            .cloned(),
        toolboard: serialized
            .toolboard
            .as_deref()
            .and_then(|id| catalogs.toolboard(id))
            .cloned(),
        hotend,
        thermistor,
        nozzle: Some(serialized.nozzle.unwrap_or_else(data::default_nozzle)),
        ..Default::default()
    };

    let th = Some(&toolhead);
    let x_endstop = serialized
        .x_endstop
        .filter(|e| x_endstop_options(config, th).contains(e));
    let y_endstop = serialized
        .y_endstop
        .filter(|e| y_endstop_options(config, th).contains(e));
    let part_fan = serialized
        .part_fan
        .filter(|f| part_fan_options(config, th).contains(f));
    let hotend_fan = serialized
        .hotend_fan
        .filter(|f| hotend_fan_options(config, th).contains(f));
    let fallback_accelerometer =
        default_accelerometer(config.controlboard.as_ref(), toolhead.toolboard.as_ref());
    let x_accelerometer = match serialized.x_accelerometer {
        Some(selected) => Some(selected).filter(|a| x_accelerometer_options(config, th).contains(a)),
        None => Some(fallback_accelerometer),
    };
    let y_accelerometer = match serialized.y_accelerometer {
        Some(selected) => Some(selected).filter(|a| y_accelerometer_options(config, th).contains(a)),
        None => Some(fallback_accelerometer),
    };

    toolhead.x_endstop = x_endstop;
    toolhead.y_endstop = y_endstop;
    toolhead.part_fan = part_fan;
    toolhead.hotend_fan = hotend_fan;
    toolhead.x_accelerometer = x_accelerometer;
    toolhead.y_accelerometer = y_accelerometer;
    toolhead
}

/// Strict resolution: every reference must resolve and every selection must be valid
#[instrument(skip_all, fields(printer = %serialized.printer))]
pub async fn resolve_full(
    serialized: &SerializedPrinterConfiguration,
    cache: &CatalogCache,
) -> ConfigResult<PrinterConfiguration> {
    let catalogs = Catalogs::fetch(cache).await?;

    let printer = find_entry(&catalogs.printers, &serialized.printer)
        .cloned()
        .ok_or_else(|| ConfiguratorError::unresolved(ReferenceKind::Printer, &serialized.printer))?;

    let size = match serialized.size {
        Some(size) if printer.supports_size(size) => BuildSize::cube(size),
        Some(size) => {
            return Err(ConfiguratorError::Validation(format!(
                "Size {} is not available for {} (available: {:?})",
                size, printer.name, printer.sizes
            )))
        }
        None => printer.default_size().ok_or_else(|| {
            ConfiguratorError::Validation(format!("{} declares no sizes", printer.name))
        })?,
    };

    let controlboard = resolve_controlboard(&serialized.controlboard, &catalogs)?;

    let layout: Vec<_> = serialized
        .toolheads
        .iter()
        .map(|t| (t.tool, t.axis.unwrap_or_else(|| default_tool_axis(t.tool))))
        .collect();
    validate_toolhead_layout(&layout)?;

    let toolheads = join_all(
        serialized
            .toolheads
            .iter()
            .map(|toolhead| resolve_full_toolhead(toolhead, &catalogs, &controlboard)),
    )
    .await
    .into_iter()
    .collect::<ConfigResult<Vec<_>>>()?;

    let rail_axes: Vec<_> = serialized.rails.iter().map(|r| r.axis).collect();
    validate_rail_axes(&rail_axes, &printer.required_axes())?;
    let rails = serialized
        .rails
        .iter()
        .map(resolve_rail)
        .collect::<ConfigResult<Vec<_>>>()?;

    let board_view = PartialPrinterConfiguration {
        controlboard: Some(controlboard.clone()),
        ..Default::default()
    };
    let controller_fan = ensure_option(
        "controller fan",
        serialized
            .controller_fan
            .unwrap_or(printer.defaults.controller_fan),
        &controller_fan_options(&board_view),
    )?;

    debug!(
        "Resolved {} with {} toolheads and {} rails",
        printer.name,
        toolheads.len(),
        rails.len()
    );

    Ok(PrinterConfiguration {
        printer,
        size,
        controlboard,
        toolheads,
        rails,
        controller_fan,
        performance_mode: serialized.performance_mode,
        stealthchop: serialized.stealthchop,
        standstill_stealth: serialized.standstill_stealth,
    })
}

fn resolve_controlboard(id: &str, catalogs: &Catalogs) -> ConfigResult<Board> {
    let board = find_entry(&catalogs.boards, id)
        .ok_or_else(|| ConfiguratorError::unresolved(ReferenceKind::Controlboard, id))?;
    if board.is_toolboard {
        return Err(ConfiguratorError::Validation(format!(
            "{} is a toolboard and can't be used as the controlboard",
            board.name
        )));
    }
    Ok(board.clone())
}

async fn resolve_full_toolhead(
    serialized: &SerializedToolheadConfiguration,
    catalogs: &Catalogs,
    controlboard: &Board,
) -> ConfigResult<ToolheadConfiguration> {
    let name = format!("T{}", serialized.tool);

    let hotend = find_entry(&catalogs.hotends, &serialized.hotend)
        .cloned()
        .ok_or_else(|| ConfiguratorError::unresolved(ReferenceKind::Hotend, &serialized.hotend))?;
    let extruder = find_entry(&catalogs.extruders, &serialized.extruder)
        .cloned()
        .ok_or_else(|| {
            ConfiguratorError::unresolved(ReferenceKind::Extruder, &serialized.extruder)
        })?;
    let probe = match &serialized.probe {
        Some(id) => Some(
            find_entry(&catalogs.probes, id)
                .cloned()
                .ok_or_else(|| ConfiguratorError::unresolved(ReferenceKind::Probe, id))?,
        ),
        None => None,
    };
    let toolboard = match &serialized.toolboard {
        Some(id) => {
            let board = find_entry(&catalogs.boards, id)
                .ok_or_else(|| ConfiguratorError::unresolved(ReferenceKind::Toolboard, id))?;
            if !board.is_toolboard {
                return Err(ConfiguratorError::Validation(format!(
                    "{} is not a toolboard",
                    board.name
                )));
            }
            Some(board.clone())
        }
        None => None,
    };

    let thermistor = serialized
        .thermistor
        .clone()
        .unwrap_or_else(|| hotend.thermistor.clone());
    if !data::is_known_thermistor(&thermistor) {
        return Err(ConfiguratorError::unresolved(
            ReferenceKind::Thermistor,
            thermistor,
        ));
    }

    let axis = serialized
        .axis
        .unwrap_or_else(|| default_tool_axis(serialized.tool));
    let board_view = PartialPrinterConfiguration {
        controlboard: Some(controlboard.clone()),
        ..Default::default()
    };
    let tool_view = PartialToolheadConfiguration {
        tool_number: serialized.tool,
        axis,
        toolboard: toolboard.clone(),
        ..Default::default()
    };
    let view = (&board_view, Some(&tool_view));

    let x_endstop = ensure_option(
        &format!("{} x endstop", name),
        serialized.x_endstop,
        &x_endstop_options(view.0, view.1),
    )?;
    let y_endstop = ensure_option(
        &format!("{} y endstop", name),
        serialized.y_endstop,
        &y_endstop_options(view.0, view.1),
    )?;
    let part_fan = ensure_option(
        &format!("{} part fan", name),
        serialized.part_fan,
        &part_fan_options(view.0, view.1),
    )?;
    let hotend_fan = ensure_option(
        &format!("{} hotend fan", name),
        serialized.hotend_fan,
        &hotend_fan_options(view.0, view.1),
    )?;

    let fallback = default_accelerometer(Some(controlboard), toolboard.as_ref());
    let x_accelerometer = ensure_option(
        &format!("{} x accelerometer", name),
        serialized.x_accelerometer.unwrap_or(fallback),
        &x_accelerometer_options(view.0, view.1),
    )?;
    let y_accelerometer = ensure_option(
        &format!("{} y accelerometer", name),
        serialized.y_accelerometer.unwrap_or(fallback),
        &y_accelerometer_options(view.0, view.1),
    )?;

    Ok(ToolheadConfiguration {
        tool_number: serialized.tool,
        axis,
        hotend,
        extruder,
        probe,
        thermistor,
        x_endstop,
        y_endstop,
        x_accelerometer,
        y_accelerometer,
        toolboard,
        part_fan,
        hotend_fan,
        nozzle: serialized.nozzle.unwrap_or_else(data::default_nozzle),
    })
}

fn resolve_rail(serialized: &SerializedRail) -> ConfigResult<Rail> {
    let driver = data::find_driver(&serialized.driver)
        .ok_or_else(|| ConfiguratorError::unresolved(ReferenceKind::Driver, &serialized.driver))?;
    let stepper = data::find_stepper(&serialized.stepper).ok_or_else(|| {
        ConfiguratorError::unresolved(ReferenceKind::Stepper, &serialized.stepper)
    })?;

    if serialized.current <= 0.0 || serialized.current > driver.max_current {
        return Err(ConfiguratorError::Validation(format!(
            "Current {}A on axis {} is outside the {} range (max {}A)",
            serialized.current, serialized.axis, driver.title, driver.max_current
        )));
    }
    if !driver.supports_voltage(serialized.voltage) {
        return Err(ConfiguratorError::Validation(format!(
            "{} does not support {}V on axis {}",
            driver.title, serialized.voltage, serialized.axis
        )));
    }

    Ok(Rail {
        axis: serialized.axis,
        driver: driver.clone(),
        stepper: stepper.clone(),
        voltage: serialized.voltage,
        current: serialized.current,
    })
}

fn ensure_option<T: PartialEq + Copy + Display>(
    field: &str,
    selected: T,
    options: &[T],
) -> ConfigResult<T> {
    if options.contains(&selected) {
        return Ok(selected);
    }
    let available: Vec<String> = options.iter().map(ToString::to_string).collect();
    Err(ConfiguratorError::Validation(format!(
        "{} '{}' is not available with the selected hardware (available: {})",
        field,
        selected,
        available.join(", ")
    )))
}

/// The printer's default hardware in stored form
pub fn default_configuration(printer: &PrinterDefinition) -> SerializedPrinterConfiguration {
    SerializedPrinterConfiguration {
        printer: printer.id.clone(),
        size: None,
        controlboard: printer.defaults.controlboard.clone(),
        toolheads: printer.defaults.toolheads.clone(),
        rails: printer.defaults.rails.clone(),
        controller_fan: Some(printer.defaults.controller_fan),
        performance_mode: false,
        stealthchop: false,
        standstill_stealth: false,
    }
}

/// Resolves the default hardware of a printer definition
pub async fn resolve_printer_defaults(
    printer_id: &str,
    cache: &CatalogCache,
) -> ConfigResult<PrinterConfiguration> {
    let printers = cache.printers().await?;
    let printer = find_entry(&printers, printer_id)
        .ok_or_else(|| ConfiguratorError::unresolved(ReferenceKind::Printer, printer_id))?;
    resolve_full(&default_configuration(printer), cache).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_option_lists_alternatives() {
        use crate::models::EndstopKind;
        let err = ensure_option(
            "T0 x endstop",
            EndstopKind::Sensorless,
            &[EndstopKind::Endstop],
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: T0 x endstop 'sensorless' is not available with the selected hardware (available: endstop)"
        );
    }

    #[test]
    fn test_rail_current_and_voltage_checks() {
        let rail = SerializedRail {
            axis: crate::models::PrinterAxis::X,
            driver: "BTT-TMC2209-13".to_string(),
            stepper: "LDO-42STH48-2504AC".to_string(),
            voltage: 24,
            current: 1.1,
        };
        assert!(resolve_rail(&rail).is_ok());

        let too_much = SerializedRail {
            current: 2.5,
            ..rail.clone()
        };
        assert!(matches!(
            resolve_rail(&too_much),
            Err(ConfiguratorError::Validation(_))
        ));

        let wrong_voltage = SerializedRail {
            voltage: 48,
            ..rail.clone()
        };
        assert!(resolve_rail(&wrong_voltage).is_err());

        let unknown_driver = SerializedRail {
            driver: "TMC2100".to_string(),
            ..rail
        };
        assert!(matches!(
            resolve_rail(&unknown_driver),
            Err(ConfiguratorError::UnresolvedReference {
                kind: ReferenceKind::Driver,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_partial_drops_toolheads_without_a_tool_number() {
        let cache = CatalogCache::new(Arc::new(crate::config::StaticCatalog::new()));
        let mut serialized = SerializedPartialPrinterConfiguration::default();
        serialized.toolheads = vec![SerializedPartialToolheadConfiguration::default(); 300];
        serialized.toolheads[299].tool = Some(1);

        let config = resolve_partial(&serialized, &cache).await.unwrap();
        assert_eq!(config.toolheads.len(), 257);
        assert_eq!(config.toolheads[255].tool_number, 255);
        assert_eq!(config.toolheads[256].tool_number, 1);
    }
}
