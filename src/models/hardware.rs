//! Hardware definitions loaded from the catalog or the static tables

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::motion::PrinterAxis;

/// Pin map of one stepper driver slot on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotorSlot {
    pub step_pin: String,
    pub dir_pin: String,
    pub enable_pin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uart_pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cs_pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diag_pin: Option<String>,
    /// Driver soldered onto the board, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrated_driver: Option<DriverType>,
}

impl MotorSlot {
    /// Whether sensorless homing can be wired through this slot
    pub fn supports_stall_detection(&self) -> bool {
        self.diag_pin.is_some()
            && self
                .integrated_driver
                .map_or(true, |driver| driver.supports_stallguard())
    }
}

/// Fan headers the board dedicates to one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ToolFanHeaders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_2pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_4pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotend_2pin: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoardFans {
    /// Indexed by tool number
    #[serde(default)]
    pub tools: Vec<ToolFanHeaders>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_2pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_4pin: Option<String>,
}

impl BoardFans {
    pub fn tool(&self, index: usize) -> Option<&ToolFanHeaders> {
        self.tools.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccelerometerSpec {
    pub chip: String,
    pub cs_pin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spi_bus: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaterPins {
    pub heater_pin: String,
    pub sensor_pin: String,
}

/// A control board or toolboard definition (`boards/<id>/board-definition.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Directory name of the definition, assigned on load
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub manufacturer: String,
    #[serde(default)]
    pub is_toolboard: bool,
    #[serde(default)]
    pub is_host: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_link: Option<String>,
    #[serde(default)]
    pub motor_slots: BTreeMap<PrinterAxis, MotorSlot>,
    #[serde(default)]
    pub endstop_pins: BTreeMap<PrinterAxis, String>,
    #[serde(default)]
    pub fans: BoardFans,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accelerometer: Option<AccelerometerSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_pin: Option<String>,
    /// Indexed by tool number
    #[serde(default)]
    pub extruder_heaters: Vec<HeaterPins>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed_heater: Option<HeaterPins>,
}

impl Board {
    pub fn motor_slot(&self, axis: PrinterAxis) -> Option<&MotorSlot> {
        self.motor_slots.get(&axis)
    }

    pub fn supports_stall_detection(&self, axis: PrinterAxis) -> bool {
        self.motor_slot(axis)
            .map_or(false, MotorSlot::supports_stall_detection)
    }

    pub fn has_accelerometer(&self) -> bool {
        self.accelerometer.is_some()
    }

    /// Prefix pins are qualified with in generated sections
    pub fn mcu_prefix(&self, tool: u8) -> String {
        if self.is_toolboard {
            format!("toolboard_t{}:", tool)
        } else {
            String::new()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NozzleType {
    #[default]
    Regular,
    HighFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nozzle {
    #[serde(rename = "type", default)]
    pub nozzle_type: NozzleType,
    pub diameter: f64,
}

/// Hotend catalog entry (`hotends/<id>.cfg`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotend {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub thermistor: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_temp: Option<u32>,
}

/// Extruder catalog entry (`extruders/<id>.cfg`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extruder {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub stepper: String,
    pub current: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_distance: Option<f64>,
}

/// Z-probe catalog entry (`z-probe/<id>.cfg`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Probe {
    #[serde(default)]
    pub id: String,
    pub title: String,
    /// Whether the probe is wired to the board's probe pin
    #[serde(default)]
    pub uses_probe_pin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriverType {
    Tmc2208,
    Tmc2209,
    Tmc2226,
    Tmc2130,
    Tmc5160,
}

impl DriverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverType::Tmc2208 => "TMC2208",
            DriverType::Tmc2209 => "TMC2209",
            DriverType::Tmc2226 => "TMC2226",
            DriverType::Tmc2130 => "TMC2130",
            DriverType::Tmc5160 => "TMC5160",
        }
    }

    pub fn supports_stallguard(&self) -> bool {
        self.stallguard_option().is_some()
    }

    /// Klipper option holding the stallguard threshold, `None` without stall detection
    pub fn stallguard_option(&self) -> Option<&'static str> {
        match self {
            DriverType::Tmc2209 | DriverType::Tmc2226 => Some("driver_SGTHRS"),
            DriverType::Tmc2130 | DriverType::Tmc5160 => Some("driver_SGT"),
            DriverType::Tmc2208 => None,
        }
    }
}

impl fmt::Display for DriverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DriverProtocol {
    Uart,
    Spi,
}

/// Stepper driver from the static driver table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub driver_type: DriverType,
    pub protocol: DriverProtocol,
    pub sense_resistor: f64,
    pub cooling_current_threshold: f64,
    pub voltages: Vec<u32>,
    pub max_current: f64,
    #[serde(default)]
    pub external: bool,
}

impl Driver {
    pub fn supports_voltage(&self, voltage: u32) -> bool {
        self.voltages.contains(&voltage)
    }
}

/// Stepper motor from the static stepper table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stepper {
    pub id: String,
    pub title: String,
    pub full_steps_per_rotation: u32,
    pub max_peak_current: f64,
}
