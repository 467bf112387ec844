//! Selectable hardware options derived from partial configuration state
//!
//! Every resolver reads only the control board, the toolhead's toolboard and
//! the toolhead's carriage. An unknown board or toolhead yields the widest
//! set that could still be valid; membership is checked again on full
//! resolution.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{
    AccelerometerKind, Board, EndstopKind, FanPort, PartialPrinterConfiguration,
    PartialToolheadConfiguration, PrinterAxis, ResolvedOptions, ToolAxis,
};

pub type ResolverFn =
    fn(&PartialPrinterConfiguration, Option<&PartialToolheadConfiguration>) -> ResolvedOptions;

/// Named option queries exposed to CLI and RPC callers; the discriminant
/// indexes the resolver table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionQuery {
    XEndstop,
    YEndstop,
    PartFan,
    HotendFan,
    ControllerFan,
    XAccelerometer,
    YAccelerometer,
}

static RESOLVERS: [(OptionQuery, ResolverFn); 7] = [
    (OptionQuery::XEndstop, resolve_x_endstops),
    (OptionQuery::YEndstop, resolve_y_endstops),
    (OptionQuery::PartFan, resolve_part_fans),
    (OptionQuery::HotendFan, resolve_hotend_fans),
    (OptionQuery::ControllerFan, resolve_controller_fans),
    (OptionQuery::XAccelerometer, resolve_x_accelerometers),
    (OptionQuery::YAccelerometer, resolve_y_accelerometers),
];

impl OptionQuery {
    pub const ALL: [OptionQuery; 7] = [
        OptionQuery::XEndstop,
        OptionQuery::YEndstop,
        OptionQuery::PartFan,
        OptionQuery::HotendFan,
        OptionQuery::ControllerFan,
        OptionQuery::XAccelerometer,
        OptionQuery::YAccelerometer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionQuery::XEndstop => "x-endstop",
            OptionQuery::YEndstop => "y-endstop",
            OptionQuery::PartFan => "part-fan",
            OptionQuery::HotendFan => "hotend-fan",
            OptionQuery::ControllerFan => "controller-fan",
            OptionQuery::XAccelerometer => "x-accelerometer",
            OptionQuery::YAccelerometer => "y-accelerometer",
        }
    }

    pub fn resolver(&self) -> ResolverFn {
        RESOLVERS[*self as usize].1
    }

    pub fn resolve(
        &self,
        config: &PartialPrinterConfiguration,
        toolhead: Option<&PartialToolheadConfiguration>,
    ) -> ResolvedOptions {
        (self.resolver())(config, toolhead)
    }
}

impl fmt::Display for OptionQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionQuery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        OptionQuery::ALL
            .into_iter()
            .find(|query| query.as_str() == normalized)
            .ok_or_else(|| format!("Invalid option query: {}", s))
    }
}

fn resolve_x_endstops(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> ResolvedOptions {
    ResolvedOptions::Endstops(x_endstop_options(config, toolhead))
}

fn resolve_y_endstops(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> ResolvedOptions {
    ResolvedOptions::Endstops(y_endstop_options(config, toolhead))
}

fn resolve_part_fans(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> ResolvedOptions {
    ResolvedOptions::Fans(part_fan_options(config, toolhead))
}

fn resolve_hotend_fans(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> ResolvedOptions {
    ResolvedOptions::Fans(hotend_fan_options(config, toolhead))
}

fn resolve_controller_fans(
    config: &PartialPrinterConfiguration,
    _toolhead: Option<&PartialToolheadConfiguration>,
) -> ResolvedOptions {
    ResolvedOptions::Fans(controller_fan_options(config))
}

fn resolve_x_accelerometers(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> ResolvedOptions {
    ResolvedOptions::Accelerometers(x_accelerometer_options(config, toolhead))
}

fn resolve_y_accelerometers(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> ResolvedOptions {
    ResolvedOptions::Accelerometers(y_accelerometer_options(config, toolhead))
}

/// Toolboard of the toolhead: `Err(())` when the toolhead itself is unknown
fn toolboard(toolhead: Option<&PartialToolheadConfiguration>) -> Result<Option<&Board>, ()> {
    toolhead.map(|t| t.toolboard.as_ref()).ok_or(())
}

fn carriage(toolhead: Option<&PartialToolheadConfiguration>) -> ToolAxis {
    toolhead.map(|t| t.axis).unwrap_or_default()
}

pub fn x_endstop_options(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> Vec<EndstopKind> {
    let mut options = vec![EndstopKind::Endstop];

    if !matches!(toolboard(toolhead), Ok(None)) {
        options.push(EndstopKind::EndstopToolboard);
    }

    let axis = carriage(toolhead).printer_axis();
    let stall_detection = config
        .controlboard
        .as_ref()
        .map_or(true, |board| board.supports_stall_detection(axis));
    if stall_detection {
        options.push(EndstopKind::Sensorless);
    }

    options
}

pub fn y_endstop_options(
    config: &PartialPrinterConfiguration,
    _toolhead: Option<&PartialToolheadConfiguration>,
) -> Vec<EndstopKind> {
    let mut options = vec![EndstopKind::Endstop];

    let stall_detection = config
        .controlboard
        .as_ref()
        .map_or(true, |board| board.supports_stall_detection(PrinterAxis::Y));
    if stall_detection {
        options.push(EndstopKind::Sensorless);
    }

    options
}

pub fn part_fan_options(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> Vec<FanPort> {
    let mut options = Vec::new();
    let index = carriage(toolhead).tool_index();

    match &config.controlboard {
        None => options.extend([FanPort::TwoPin, FanPort::FourPin]),
        Some(board) => {
            if let Some(headers) = board.fans.tool(index) {
                if headers.part_2pin.is_some() {
                    options.push(FanPort::TwoPin);
                }
                if headers.part_4pin.is_some() {
                    options.push(FanPort::FourPin);
                }
            }
        }
    }

    match toolboard(toolhead) {
        Err(()) => options.extend([FanPort::TwoPinToolboard, FanPort::FourPinToolboard]),
        Ok(Some(board)) => {
            if let Some(headers) = board.fans.tool(0) {
                if headers.part_2pin.is_some() {
                    options.push(FanPort::TwoPinToolboard);
                }
                if headers.part_4pin.is_some() {
                    options.push(FanPort::FourPinToolboard);
                }
            }
        }
        Ok(None) => {}
    }

    options
}

pub fn hotend_fan_options(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> Vec<FanPort> {
    let mut options = Vec::new();
    let index = carriage(toolhead).tool_index();

    let controlboard_header = config.controlboard.as_ref().map_or(true, |board| {
        board
            .fans
            .tool(index)
            .map_or(false, |headers| headers.hotend_2pin.is_some())
    });
    if controlboard_header {
        options.push(FanPort::TwoPin);
    }

    let toolboard_header = match toolboard(toolhead) {
        Err(()) => true,
        Ok(Some(board)) => board
            .fans
            .tool(0)
            .map_or(false, |headers| headers.hotend_2pin.is_some()),
        Ok(None) => false,
    };
    if toolboard_header {
        options.push(FanPort::TwoPinToolboard);
    }

    options
}

pub fn controller_fan_options(config: &PartialPrinterConfiguration) -> Vec<FanPort> {
    match &config.controlboard {
        None => vec![FanPort::TwoPin, FanPort::FourPin],
        Some(board) => {
            let mut options = Vec::new();
            if board.fans.controller_2pin.is_some() {
                options.push(FanPort::TwoPin);
            }
            if board.fans.controller_4pin.is_some() {
                options.push(FanPort::FourPin);
            }
            options
        }
    }
}

fn accelerometer_options(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> Vec<AccelerometerKind> {
    let mut options = Vec::new();

    if config
        .controlboard
        .as_ref()
        .map_or(true, Board::has_accelerometer)
    {
        options.push(AccelerometerKind::Controlboard);
    }

    let toolboard_accelerometer = match toolboard(toolhead) {
        Err(()) => true,
        Ok(board) => board.map_or(false, Board::has_accelerometer),
    };
    if toolboard_accelerometer {
        options.push(AccelerometerKind::Toolboard);
    }

    options.push(AccelerometerKind::Rpi);
    options
}

pub fn x_accelerometer_options(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> Vec<AccelerometerKind> {
    accelerometer_options(config, toolhead)
}

pub fn y_accelerometer_options(
    config: &PartialPrinterConfiguration,
    toolhead: Option<&PartialToolheadConfiguration>,
) -> Vec<AccelerometerKind> {
    accelerometer_options(config, toolhead)
}

/// Accelerometer used when none is selected
pub fn default_accelerometer(
    controlboard: Option<&Board>,
    toolboard: Option<&Board>,
) -> AccelerometerKind {
    if toolboard.map_or(false, Board::has_accelerometer) {
        AccelerometerKind::Toolboard
    } else if controlboard.map_or(false, Board::has_accelerometer) {
        AccelerometerKind::Controlboard
    } else {
        AccelerometerKind::Rpi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccelerometerSpec, BoardFans, MotorSlot, ToolFanHeaders};
    use std::collections::BTreeMap;

    fn slot(diag: bool) -> MotorSlot {
        MotorSlot {
            step_pin: "PF13".to_string(),
            dir_pin: "PF12".to_string(),
            enable_pin: "!PF14".to_string(),
            uart_pin: Some("PC4".to_string()),
            cs_pin: None,
            diag_pin: diag.then(|| "PG6".to_string()),
            integrated_driver: None,
        }
    }

    fn board(x_diag: bool, accelerometer: bool) -> Board {
        let mut motor_slots = BTreeMap::new();
        motor_slots.insert(PrinterAxis::X, slot(x_diag));
        motor_slots.insert(PrinterAxis::Y, slot(true));
        Board {
            id: "octopus".to_string(),
            name: "Octopus".to_string(),
            manufacturer: "BTT".to_string(),
            is_toolboard: false,
            is_host: false,
            serial_path: None,
            documentation_link: None,
            motor_slots,
            endstop_pins: BTreeMap::new(),
            fans: BoardFans {
                tools: vec![ToolFanHeaders {
                    part_2pin: Some("PA8".to_string()),
                    part_4pin: None,
                    hotend_2pin: Some("PE5".to_string()),
                }],
                controller_2pin: Some("PD12".to_string()),
                controller_4pin: Some("PD13".to_string()),
            },
            accelerometer: accelerometer.then(|| AccelerometerSpec {
                chip: "adxl345".to_string(),
                cs_pin: "PA15".to_string(),
                spi_bus: None,
            }),
            probe_pin: None,
            extruder_heaters: Vec::new(),
            bed_heater: None,
        }
    }

    fn toolboard_board() -> Board {
        Board {
            id: "ebb42".to_string(),
            is_toolboard: true,
            motor_slots: BTreeMap::new(),
            fans: BoardFans {
                tools: vec![ToolFanHeaders {
                    part_2pin: Some("PA0".to_string()),
                    part_4pin: None,
                    hotend_2pin: Some("PA1".to_string()),
                }],
                controller_2pin: None,
                controller_4pin: None,
            },
            ..board(false, true)
        }
    }

    fn config(controlboard: Option<Board>) -> PartialPrinterConfiguration {
        PartialPrinterConfiguration {
            controlboard,
            ..Default::default()
        }
    }

    #[test]
    fn test_no_toolboard_no_stall_detection_single_endstop() {
        let config = config(Some(board(false, false)));
        let toolhead = PartialToolheadConfiguration::default();
        assert_eq!(
            x_endstop_options(&config, Some(&toolhead)),
            vec![EndstopKind::Endstop]
        );
    }

    #[test]
    fn test_unknown_board_and_toolhead_yield_superset() {
        let config = config(None);
        assert_eq!(
            x_endstop_options(&config, None),
            vec![
                EndstopKind::Endstop,
                EndstopKind::EndstopToolboard,
                EndstopKind::Sensorless
            ]
        );
        assert_eq!(part_fan_options(&config, None).len(), 4);
        assert_eq!(controller_fan_options(&config), vec![FanPort::TwoPin, FanPort::FourPin]);
        assert_eq!(x_accelerometer_options(&config, None).len(), 3);
    }

    #[test]
    fn test_endstops_ignore_unrelated_fields() {
        let config = config(Some(board(true, false)));
        let mut toolhead = PartialToolheadConfiguration {
            toolboard: Some(toolboard_board()),
            ..Default::default()
        };
        let before = x_endstop_options(&config, Some(&toolhead));

        toolhead.part_fan = Some(FanPort::TwoPinToolboard);
        toolhead.x_endstop = Some(EndstopKind::Sensorless);
        toolhead.thermistor = Some("PT1000".to_string());
        assert_eq!(x_endstop_options(&config, Some(&toolhead)), before);
        assert_eq!(x_endstop_options(&config, Some(&toolhead)), before);
    }

    #[test]
    fn test_toolboard_fans() {
        let config = config(Some(board(true, false)));
        let toolhead = PartialToolheadConfiguration {
            toolboard: Some(toolboard_board()),
            ..Default::default()
        };
        assert_eq!(
            part_fan_options(&config, Some(&toolhead)),
            vec![FanPort::TwoPin, FanPort::TwoPinToolboard]
        );
        assert_eq!(
            hotend_fan_options(&config, Some(&toolhead)),
            vec![FanPort::TwoPin, FanPort::TwoPinToolboard]
        );
    }

    #[test]
    fn test_dual_carriage_without_headers() {
        let config = config(Some(board(true, false)));
        let toolhead = PartialToolheadConfiguration {
            tool_number: 1,
            axis: ToolAxis::DualCarriage,
            ..Default::default()
        };
        assert!(part_fan_options(&config, Some(&toolhead)).is_empty());
        // No dual_carriage slot on the board
        assert_eq!(
            x_endstop_options(&config, Some(&toolhead)),
            vec![EndstopKind::Endstop]
        );
    }

    #[test]
    fn test_accelerometer_options_and_default() {
        let config = config(Some(board(true, false)));
        let toolhead = PartialToolheadConfiguration {
            toolboard: Some(toolboard_board()),
            ..Default::default()
        };
        assert_eq!(
            y_accelerometer_options(&config, Some(&toolhead)),
            vec![AccelerometerKind::Toolboard, AccelerometerKind::Rpi]
        );

        let toolboard = toolboard_board();
        let with_adxl = board(true, true);
        let without_adxl = board(true, false);
        assert_eq!(
            default_accelerometer(Some(&with_adxl), Some(&toolboard)),
            AccelerometerKind::Toolboard
        );
        assert_eq!(
            default_accelerometer(Some(&with_adxl), None),
            AccelerometerKind::Controlboard
        );
        assert_eq!(
            default_accelerometer(Some(&without_adxl), None),
            AccelerometerKind::Rpi
        );
    }

    #[test]
    fn test_resolver_table_order() {
        for (index, (query, _)) in RESOLVERS.iter().enumerate() {
            assert_eq!(*query as usize, index);
        }
    }

    #[test]
    fn test_query_dispatch() {
        let config = config(Some(board(true, true)));
        for query in OptionQuery::ALL {
            let parsed: OptionQuery = query.as_str().parse().unwrap();
            assert_eq!(parsed, query);
            assert!(!query.resolve(&config, None).is_empty());
        }
        assert_eq!("x_endstop".parse::<OptionQuery>().unwrap(), OptionQuery::XEndstop);
        assert!("z-endstop".parse::<OptionQuery>().is_err());
        assert!(matches!(
            OptionQuery::ControllerFan.resolve(&config, None),
            ResolvedOptions::Fans(_)
        ));
    }
}
