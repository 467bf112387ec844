//! Configuration fragments shared by all printer templates

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt::Write;

use super::families::{AxisMargin, UserStepperSpec};
use crate::models::{
    AccelerometerKind, Board, DriverProtocol, EndstopKind, FanPort, MotorSlot,
    NozzleType, PrinterAxis, PrinterConfiguration, Rail, ToolAxis, ToolheadConfiguration,
};
use crate::{ConfigResult, ConfiguratorError};

/// Axis a sensorless homing file is generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingAxis {
    X,
    Y,
}

impl HomingAxis {
    pub const ALL: [HomingAxis; 2] = [HomingAxis::X, HomingAxis::Y];

    pub fn file_name(&self) -> &'static str {
        match self {
            HomingAxis::X => "sensorless-x.cfg",
            HomingAxis::Y => "sensorless-y.cfg",
        }
    }

    /// Fraction of the run current used while homing
    fn homing_current_factor(&self) -> f64 {
        match self {
            HomingAxis::X => 0.35,
            HomingAxis::Y => 0.51,
        }
    }
}

/// Stallguard wiring of one stepper homed without an endstop switch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorlessAxis {
    pub stepper: String,
    pub driver: String,
    pub driver_section: String,
    pub diag_pin: String,
    pub threshold_option: &'static str,
    pub threshold: i32,
    pub virtual_endstop: String,
    pub homing_current: String,
}

/// Capabilities the printer templates are rendered with
pub trait ConfigHelper {
    fn render_boards(&self) -> String;
    fn render_base(&self) -> String;
    fn render_extruders(&self) -> String;
    fn render_hotends(&self) -> String;
    fn render_input_shaper(&self) -> String;
    fn render_motor_sections(&self) -> String;
    fn render_speed_limits(&self) -> String;
    fn macro_travel_speed(&self) -> u32;
    fn render_probe_includes(&self) -> String;
    fn render_probe_pin_section(&self) -> String;
    fn render_endstop_section(&self) -> String;
    fn render_fans(&self) -> String;
    fn render_macros(&self) -> String;
    fn render_macro_variable_overrides(&self) -> String;
    fn render_user_macro_variable_overrides(&self, lines: &[&str]) -> String;
    fn render_save_variables(&self, variables: &[(&str, i64)]) -> String;
    fn render_user_stepper_sections(&self, steppers: &[UserStepperSpec], margin: AxisMargin)
        -> String;
    fn render_reminders(&self) -> String;
    fn sensorless_axes(&self, axis: HomingAxis) -> ConfigResult<Vec<SensorlessAxis>>;
}

pub const MACRO_VARIABLES_SECTION: &str = "[gcode_macro _CONFIGURATOR_VARIABLES]";

/// A rail bound to the board slot driving it
#[derive(Debug)]
struct MotorBinding<'a> {
    rail: &'a Rail,
    slot: &'a MotorSlot,
    prefix: String,
}

impl MotorBinding<'_> {
    fn pin(&self, pin: &str) -> String {
        format!("{}{}", self.prefix, pin)
    }

    fn driver_section(&self) -> String {
        format!(
            "{} {}",
            self.rail.driver.driver_type.as_str().to_lowercase(),
            self.rail.axis.stepper_section()
        )
    }
}

/// Pins of one toolhead, looked up once on construction
#[derive(Debug)]
struct ToolBinding<'a> {
    toolhead: &'a ToolheadConfiguration,
    prefix: String,
    heater_pin: String,
    sensor_pin: String,
    part_fan_pin: String,
    hotend_fan_pin: String,
}

impl ToolBinding<'_> {
    fn extruder_section(&self) -> &'static str {
        if self.toolhead.tool_number == 0 {
            "extruder"
        } else {
            "extruder1"
        }
    }
}

/// Klipper implementation of [`ConfigHelper`]
#[derive(Debug)]
pub struct KlipperConfigHelper<'a> {
    config: &'a PrinterConfiguration,
    motors: Vec<MotorBinding<'a>>,
    tools: Vec<ToolBinding<'a>>,
    controller_fan_pin: String,
}

impl<'a> KlipperConfigHelper<'a> {
    /// Binds every rail and toolhead to board pins, failing on the first gap
    pub fn new(config: &'a PrinterConfiguration) -> ConfigResult<Self> {
        let board = &config.controlboard;

        let mut motors = Vec::with_capacity(config.rails.len());
        for rail in &config.rails {
            motors.push(bind_motor(config, rail)?);
        }

        let mut tools = Vec::with_capacity(config.toolheads.len());
        for toolhead in &config.toolheads {
            tools.push(bind_tool(board, toolhead)?);
        }

        let controller_fan_pin = match config.controller_fan {
            FanPort::TwoPin => board.fans.controller_2pin.clone(),
            FanPort::FourPin => board.fans.controller_4pin.clone(),
            _ => None,
        }
        .ok_or_else(|| {
            ConfiguratorError::InconsistentHardware(format!(
                "{} has no {} for the controller fan",
                board.name,
                config.controller_fan.title()
            ))
        })?;

        for toolhead in &config.toolheads {
            for kind in [toolhead.x_accelerometer, toolhead.y_accelerometer] {
                let available = match kind {
                    AccelerometerKind::Controlboard => board.has_accelerometer(),
                    AccelerometerKind::Toolboard => toolhead
                        .toolboard
                        .as_ref()
                        .map_or(false, Board::has_accelerometer),
                    AccelerometerKind::Rpi => true,
                };
                if !available {
                    return Err(ConfiguratorError::InconsistentHardware(format!(
                        "{} has no {} accelerometer",
                        toolhead.name(),
                        kind
                    )));
                }
            }
        }

        Ok(Self {
            config,
            motors,
            tools,
            controller_fan_pin,
        })
    }

    fn motor(&self, axis: PrinterAxis) -> Option<&MotorBinding<'a>> {
        self.motors.iter().find(|m| m.rail.axis == axis)
    }

    fn microsteps(&self) -> u32 {
        if self.config.performance_mode {
            16
        } else {
            64
        }
    }

    fn velocity_limits(&self) -> (u32, u32) {
        if self.config.performance_mode {
            (400, 10000)
        } else {
            (300, 5000)
        }
    }

    /// The tool riding the x carriage decides y homing
    fn primary_tool(&self) -> Option<&ToolBinding<'a>> {
        self.tools
            .iter()
            .find(|t| t.toolhead.axis == ToolAxis::X)
            .or_else(|| self.tools.first())
    }

    fn endstop_pin(&self, tool: &ToolBinding<'_>, axis: PrinterAxis, kind: EndstopKind) -> String {
        match kind {
            EndstopKind::Sensorless => self
                .motor(axis)
                .map(virtual_endstop)
                .unwrap_or_else(|| format!("^{}_endstop_pin", axis)),
            EndstopKind::EndstopToolboard => {
                let pin = tool
                    .toolhead
                    .toolboard
                    .as_ref()
                    .and_then(|b| b.endstop_pins.get(&PrinterAxis::X))
                    .cloned()
                    .unwrap_or_else(|| "x_endstop_pin".to_string());
                format!("^{}{}", tool.prefix, pin)
            }
            EndstopKind::Endstop => {
                let pin = self
                    .config
                    .controlboard
                    .endstop_pins
                    .get(&axis)
                    .cloned()
                    .unwrap_or_else(|| format!("{}_endstop_pin", axis));
                format!("^{}", pin)
            }
        }
    }

    fn accelerometer_chip(&self, tool: &ToolBinding<'_>, kind: AccelerometerKind) -> String {
        let chip = match kind {
            AccelerometerKind::Controlboard => self.config.controlboard.accelerometer.as_ref(),
            AccelerometerKind::Toolboard => tool
                .toolhead
                .toolboard
                .as_ref()
                .and_then(|b| b.accelerometer.as_ref()),
            AccelerometerKind::Rpi => None,
        }
        .map_or("adxl345", |spec| spec.chip.as_str());

        match kind {
            AccelerometerKind::Toolboard => format!("{} toolboard_t{}", chip, tool.toolhead.tool_number),
            other => format!("{} {}", chip, other),
        }
    }

    fn accelerometer_section(&self, tool: &ToolBinding<'_>, kind: AccelerometerKind) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[{}]", self.accelerometer_chip(tool, kind));
        let spec = match kind {
            AccelerometerKind::Controlboard => self.config.controlboard.accelerometer.as_ref(),
            AccelerometerKind::Toolboard => tool
                .toolhead
                .toolboard
                .as_ref()
                .and_then(|b| b.accelerometer.as_ref()),
            AccelerometerKind::Rpi => None,
        };
        match spec {
            Some(spec) => {
                let prefix = if kind == AccelerometerKind::Toolboard {
                    tool.prefix.as_str()
                } else {
                    ""
                };
                let _ = writeln!(out, "cs_pin: {}{}", prefix, spec.cs_pin);
                if let Some(bus) = &spec.spi_bus {
                    let _ = writeln!(out, "spi_bus: {}", bus);
                }
            }
            None => {
                let _ = writeln!(out, "cs_pin: rpi:None");
                let _ = writeln!(out, "spi_bus: spidev0.2");
            }
        }
        out
    }

    fn stall_threshold(option: &str) -> i32 {
        if option == "driver_SGT" {
            1
        } else {
            80
        }
    }
}

fn bind_motor<'a>(config: &'a PrinterConfiguration, rail: &'a Rail) -> ConfigResult<MotorBinding<'a>> {
    let board = &config.controlboard;

    if let Some(tool) = rail.axis.extruder_tool() {
        let toolboard = config
            .toolheads
            .iter()
            .find(|t| t.tool_number == tool)
            .and_then(|t| t.toolboard.as_ref());
        if let Some(slot) = toolboard.and_then(|b| b.motor_slot(PrinterAxis::Extruder)) {
            return Ok(MotorBinding {
                rail,
                slot,
                prefix: format!("toolboard_t{}:", tool),
            });
        }
    }

    let slot = board.motor_slot(rail.axis).ok_or_else(|| {
        ConfiguratorError::InconsistentHardware(format!(
            "{} has no motor slot for axis {}",
            board.name, rail.axis
        ))
    })?;

    let driver_pin = match rail.driver.protocol {
        DriverProtocol::Uart => slot.uart_pin.as_ref(),
        DriverProtocol::Spi => slot.cs_pin.as_ref(),
    };
    if driver_pin.is_none() && !rail.driver.external {
        return Err(ConfiguratorError::InconsistentHardware(format!(
            "Motor slot for axis {} on {} can't talk to a {:?} driver",
            rail.axis, board.name, rail.driver.protocol
        )));
    }

    Ok(MotorBinding {
        rail,
        slot,
        prefix: String::new(),
    })
}

fn bind_tool<'a>(
    board: &'a Board,
    toolhead: &'a ToolheadConfiguration,
) -> ConfigResult<ToolBinding<'a>> {
    // Headers are laid out per carriage, same as the option resolver reads them
    let index = toolhead.axis.tool_index();
    let name = toolhead.name();
    let missing = |what: &str, on: &str| {
        ConfiguratorError::InconsistentHardware(format!("{} has no {} for {}", on, what, name))
    };

    let (heater_board, heater_index, prefix) = match &toolhead.toolboard {
        Some(toolboard) => (toolboard, 0, toolboard.mcu_prefix(toolhead.tool_number)),
        None => (board, index, String::new()),
    };
    let heater = heater_board
        .extruder_heaters
        .get(heater_index)
        .ok_or_else(|| missing("extruder heater", &heater_board.name))?;

    let fan_pin = |port: FanPort, part: bool| -> ConfigResult<String> {
        let (source, headers_index, pin_prefix) = if port.on_toolboard() {
            let toolboard = toolhead
                .toolboard
                .as_ref()
                .ok_or_else(|| missing("toolboard", "toolhead"))?;
            (toolboard, 0, prefix.clone())
        } else {
            (board, index, String::new())
        };
        let headers = source.fans.tool(headers_index);
        let pin = match (part, port.is_four_pin()) {
            (true, false) => headers.and_then(|h| h.part_2pin.clone()),
            (true, true) => headers.and_then(|h| h.part_4pin.clone()),
            (false, false) => headers.and_then(|h| h.hotend_2pin.clone()),
            (false, true) => None,
        };
        pin.map(|p| format!("{}{}", pin_prefix, p))
            .ok_or_else(|| missing(port.title(), &source.name))
    };

    Ok(ToolBinding {
        toolhead,
        heater_pin: format!("{}{}", prefix, heater.heater_pin),
        sensor_pin: format!("{}{}", prefix, heater.sensor_pin),
        part_fan_pin: fan_pin(toolhead.part_fan, true)?,
        hotend_fan_pin: fan_pin(toolhead.hotend_fan, false)?,
        prefix,
    })
}

fn virtual_endstop(motor: &MotorBinding<'_>) -> String {
    format!(
        "{}_{}:virtual_endstop",
        motor.rail.driver.driver_type.as_str().to_lowercase(),
        motor.rail.axis.stepper_section()
    )
}

fn carriage_axis(toolhead: &ToolheadConfiguration) -> PrinterAxis {
    toolhead.axis.printer_axis()
}

impl ConfigHelper for KlipperConfigHelper<'_> {
    fn render_boards(&self) -> String {
        let board = &self.config.controlboard;
        let mut out = String::new();
        let _ = writeln!(out, "[include configurator/boards/{}/config.cfg]", board.id);
        let _ = writeln!(out);
        let _ = writeln!(out, "[mcu]");
        let _ = writeln!(
            out,
            "serial: {}",
            board
                .serial_path
                .clone()
                .unwrap_or_else(|| format!("/dev/{}", board.id))
        );

        for tool in &self.tools {
            if let Some(toolboard) = &tool.toolhead.toolboard {
                let _ = writeln!(out);
                let _ = writeln!(
                    out,
                    "[include configurator/boards/{}/config.cfg]",
                    toolboard.id
                );
                let _ = writeln!(out, "[mcu toolboard_t{}]", tool.toolhead.tool_number);
                let _ = writeln!(
                    out,
                    "serial: {}",
                    toolboard
                        .serial_path
                        .clone()
                        .unwrap_or_else(|| format!("/dev/{}-t{}", toolboard.id, tool.toolhead.tool_number))
                );
            }
        }
        out
    }

    fn render_base(&self) -> String {
        let printer = &self.config.printer;
        let mut out = String::new();
        let _ = writeln!(
            out,
            "[include configurator/printers/{}/{}.cfg]",
            printer.id, printer.id
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "[printer]");
        let _ = writeln!(out, "kinematics: {}", printer.kinematics.klipper_name());

        if let Some(bed) = &self.config.controlboard.bed_heater {
            let _ = writeln!(out);
            let _ = writeln!(out, "[heater_bed]");
            let _ = writeln!(out, "heater_pin: {}", bed.heater_pin);
            let _ = writeln!(out, "sensor_pin: {}", bed.sensor_pin);
            let _ = writeln!(out, "sensor_type: Generic 3950");
        }
        out
    }

    fn render_extruders(&self) -> String {
        let mut out = String::new();
        for (i, tool) in self.tools.iter().enumerate() {
            let toolhead = tool.toolhead;
            if i > 0 {
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "# {} extruder: {}", toolhead.name(), toolhead.extruder.title);
            let _ = writeln!(
                out,
                "[include configurator/extruders/{}]",
                toolhead.extruder.id
            );
            let _ = writeln!(out, "[{}]", tool.extruder_section());
            let _ = writeln!(out, "heater_pin: {}", tool.heater_pin);
            let _ = writeln!(out, "sensor_pin: {}", tool.sensor_pin);
            let _ = writeln!(out, "sensor_type: {}", toolhead.thermistor);
            let _ = writeln!(out, "nozzle_diameter: {:.3}", toolhead.nozzle.diameter);
            let _ = writeln!(out, "filament_diameter: 1.750");
            let _ = writeln!(
                out,
                "max_temp: {}",
                toolhead.hotend.max_temp.unwrap_or(300)
            );
            let _ = writeln!(out, "min_temp: 0");
            if let Some(distance) = toolhead.extruder.rotation_distance {
                let _ = writeln!(out, "rotation_distance: {}", distance);
            }
        }
        out
    }

    fn render_hotends(&self) -> String {
        let mut out = String::new();
        let mut seen = BTreeSet::new();
        for tool in &self.tools {
            let hotend = &tool.toolhead.hotend;
            if seen.insert(hotend.id.as_str()) {
                let _ = writeln!(out, "# {}", hotend.title);
                let _ = writeln!(out, "[include configurator/hotends/{}]", hotend.id);
            }
        }
        out
    }

    fn render_input_shaper(&self) -> String {
        let Some(tool) = self.primary_tool() else {
            return String::new();
        };
        let x = tool.toolhead.x_accelerometer;
        let y = tool.toolhead.y_accelerometer;

        let mut out = self.accelerometer_section(tool, x);
        if y != x {
            let _ = writeln!(out);
            out.push_str(&self.accelerometer_section(tool, y));
        }

        let size = self.config.size;
        let _ = writeln!(out);
        let _ = writeln!(out, "[resonance_tester]");
        let _ = writeln!(out, "accel_chip_x: {}", self.accelerometer_chip(tool, x));
        let _ = writeln!(out, "accel_chip_y: {}", self.accelerometer_chip(tool, y));
        let _ = writeln!(out, "probe_points:");
        let _ = writeln!(out, "\t{},{},20", size.x / 2, size.y / 2);
        out
    }

    fn render_motor_sections(&self) -> String {
        // A threshold of 1 mm/s switches to spreadcycle as soon as the motor moves
        let stealth_threshold = if self.config.stealthchop {
            999999
        } else if self.config.standstill_stealth {
            1
        } else {
            0
        };
        let mut out = String::new();

        for (i, motor) in self.motors.iter().enumerate() {
            let rail = motor.rail;
            let slot = motor.slot;
            if i > 0 {
                let _ = writeln!(out);
            }
            let _ = writeln!(
                out,
                "# {} on {}, {} {}V",
                rail.axis, rail.stepper.title, rail.driver.title, rail.voltage
            );
            let _ = writeln!(out, "[{}]", rail.axis.stepper_section());
            let _ = writeln!(out, "step_pin: {}", motor.pin(&slot.step_pin));
            let _ = writeln!(out, "dir_pin: {}", motor.pin(&slot.dir_pin));
            let _ = writeln!(out, "enable_pin: !{}", motor.pin(&slot.enable_pin));
            let _ = writeln!(out, "microsteps: {}", self.microsteps());
            let _ = writeln!(
                out,
                "full_steps_per_rotation: {}",
                rail.stepper.full_steps_per_rotation
            );

            let _ = writeln!(out);
            let _ = writeln!(out, "[{}]", motor.driver_section());
            let driver_pin = match rail.driver.protocol {
                DriverProtocol::Uart => slot.uart_pin.as_ref().map(|p| ("uart_pin", p)),
                DriverProtocol::Spi => slot.cs_pin.as_ref().map(|p| ("cs_pin", p)),
            };
            if let Some((option, pin)) = driver_pin {
                let _ = writeln!(out, "{}: {}", option, motor.pin(pin));
            }
            let _ = writeln!(out, "run_current: {:.3}", rail.current);
            let _ = writeln!(out, "sense_resistor: {:.3}", rail.driver.sense_resistor);
            let _ = writeln!(out, "stealthchop_threshold: {}", stealth_threshold);
        }
        out
    }

    fn render_speed_limits(&self) -> String {
        let (velocity, accel) = self.velocity_limits();
        let mut out = String::new();
        let _ = writeln!(out, "[printer]");
        let _ = writeln!(out, "max_velocity: {}", velocity);
        let _ = writeln!(out, "max_accel: {}", accel);
        let _ = writeln!(out, "max_z_velocity: 15");
        let _ = writeln!(out, "max_z_accel: 30");
        let _ = writeln!(out, "square_corner_velocity: 5");
        out
    }

    fn macro_travel_speed(&self) -> u32 {
        let (velocity, _) = self.velocity_limits();
        velocity * 2 / 3
    }

    fn render_probe_includes(&self) -> String {
        let mut out = String::new();
        for tool in &self.tools {
            if let Some(probe) = &tool.toolhead.probe {
                let _ = writeln!(out, "# {} probe: {}", tool.toolhead.name(), probe.title);
                let _ = writeln!(out, "[include configurator/z-probe/{}]", probe.id);
            }
        }
        out
    }

    fn render_probe_pin_section(&self) -> String {
        let probe_tool = self
            .tools
            .iter()
            .find(|t| t.toolhead.probe.as_ref().map_or(false, |p| p.uses_probe_pin));
        let Some(tool) = probe_tool else {
            return String::new();
        };

        let pin = match &tool.toolhead.toolboard {
            Some(toolboard) if toolboard.probe_pin.is_some() => toolboard
                .probe_pin
                .as_ref()
                .map(|p| format!("{}{}", tool.prefix, p)),
            _ => self.config.controlboard.probe_pin.clone(),
        }
        .unwrap_or_else(|| "probe_pin".to_string());

        let mut out = String::new();
        let _ = writeln!(out, "[probe]");
        let _ = writeln!(out, "pin: ^{}", pin);
        out
    }

    fn render_endstop_section(&self) -> String {
        let mut out = String::new();
        for tool in &self.tools {
            let axis = carriage_axis(tool.toolhead);
            let _ = writeln!(out, "[{}]", axis.stepper_section());
            let _ = writeln!(
                out,
                "endstop_pin: {}",
                self.endstop_pin(tool, axis, tool.toolhead.x_endstop)
            );
            let _ = writeln!(out);
        }

        if let Some(tool) = self.primary_tool() {
            let _ = writeln!(out, "[{}]", PrinterAxis::Y.stepper_section());
            let _ = writeln!(
                out,
                "endstop_pin: {}",
                self.endstop_pin(tool, PrinterAxis::Y, tool.toolhead.y_endstop)
            );
        }
        out
    }

    fn render_fans(&self) -> String {
        let multi_tool = self.config.is_multi_tool();
        let mut out = String::new();

        for tool in &self.tools {
            let toolhead = tool.toolhead;
            let tool_id = toolhead.name().to_lowercase();
            if multi_tool {
                let _ = writeln!(out, "[fan_generic {}_part_fan]", tool_id);
            } else {
                let _ = writeln!(out, "[fan]");
            }
            let _ = writeln!(out, "pin: {}", tool.part_fan_pin);
            if toolhead.part_fan.is_four_pin() {
                let _ = writeln!(out, "cycle_time: 0.00004");
            }
            let _ = writeln!(out);

            let _ = writeln!(out, "[heater_fan {}_hotend_fan]", tool_id);
            let _ = writeln!(out, "pin: {}", tool.hotend_fan_pin);
            let _ = writeln!(out, "heater: {}", tool.extruder_section());
            let _ = writeln!(out, "heater_temp: 50.0");
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "[controller_fan controller_fan]");
        let _ = writeln!(out, "pin: {}", self.controller_fan_pin);
        if self.config.controller_fan.is_four_pin() {
            let _ = writeln!(out, "cycle_time: 0.00004");
        }
        let cooled: Vec<String> = self
            .motors
            .iter()
            .filter(|m| m.rail.needs_cooling())
            .map(|m| m.rail.axis.stepper_section())
            .collect();
        if !cooled.is_empty() {
            let _ = writeln!(out, "stepper: {}", cooled.join(","));
        }
        out
    }

    fn render_macros(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[include configurator/macros.cfg]");
        if self.config.is_multi_tool() {
            let _ = writeln!(out, "[include configurator/macros/idex/idex.cfg]");
        }
        out
    }

    fn render_macro_variable_overrides(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", MACRO_VARIABLES_SECTION);
        let _ = writeln!(
            out,
            "variable_macro_travel_speed: {}",
            self.macro_travel_speed()
        );
        let homing = match self.primary_tool() {
            Some(tool) if tool.toolhead.x_endstop == EndstopKind::Sensorless => "sensorless",
            _ => "endstops",
        };
        let _ = writeln!(out, "variable_homing: \"{}\"", homing);
        let _ = writeln!(
            out,
            "variable_toolhead_count: {}",
            self.config.toolheads.len()
        );
        for tool in &self.tools {
            let _ = writeln!(
                out,
                "variable_{}_nozzle_type: \"{}\"",
                tool.toolhead.name().to_lowercase(),
                match tool.toolhead.nozzle.nozzle_type {
                    NozzleType::Regular => "regular",
                    NozzleType::HighFlow => "high-flow",
                }
            );
        }
        out
    }

    fn render_user_macro_variable_overrides(&self, lines: &[&str]) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", MACRO_VARIABLES_SECTION);
        for line in lines {
            let _ = writeln!(out, "{}", line);
        }
        out
    }

    fn render_save_variables(&self, variables: &[(&str, i64)]) -> String {
        if variables.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        let _ = writeln!(out, "[save_variables]");
        let _ = writeln!(out, "filename: ~/printer_data/config/configurator-variables.cfg");
        let _ = writeln!(out);
        let _ = writeln!(out, "[gcode_macro _CONTROL_POINTS]");
        for (name, value) in variables {
            let _ = writeln!(out, "variable_{}: {}", name, value);
        }
        out
    }

    fn render_user_stepper_sections(
        &self,
        steppers: &[UserStepperSpec],
        margin: AxisMargin,
    ) -> String {
        let mut sections = Vec::new();
        for spec in steppers {
            let Some(motor) = self.motor(spec.axis) else {
                continue;
            };
            let mut out = String::new();
            let _ = writeln!(out, "[{}]", spec.axis.stepper_section());
            let _ = writeln!(
                out,
                "dir_pin: {}{}",
                if spec.direction_inverted { "!" } else { "" },
                motor.pin(&motor.slot.dir_pin)
            );
            if let Some(distance) = spec.rotation_distance {
                match spec.rotation_comment {
                    Some(comment) => {
                        let _ = writeln!(out, "rotation_distance: {} # {}", distance, comment);
                    }
                    None => {
                        let _ = writeln!(out, "rotation_distance: {}", distance);
                    }
                }
            }
            if let Some(limits) = spec.limits {
                let limits = limits(self.config.size, margin);
                let _ = writeln!(out, "position_min: {}", limits.min);
                let _ = writeln!(out, "position_max: {}", limits.max);
                if let Some(endstop) = limits.endstop {
                    let _ = writeln!(out, "position_endstop: {}", endstop);
                }
            }
            for line in spec.additional_lines {
                let _ = writeln!(out, "{}", line);
            }
            sections.push(out);
        }
        sections.join("\n")
    }

    fn render_reminders(&self) -> String {
        let mut out = String::new();
        let cooled: Vec<&str> = self
            .motors
            .iter()
            .filter(|m| m.rail.needs_cooling())
            .map(|m| m.rail.axis.as_str())
            .collect();
        if !cooled.is_empty() {
            let _ = writeln!(
                out,
                "# REMINDER: active driver cooling is required for axes {}",
                cooled.join(", ")
            );
        }
        if HomingAxis::ALL
            .iter()
            .any(|axis| matches!(self.sensorless_axes(*axis), Ok(axes) if !axes.is_empty()))
        {
            let _ = writeln!(
                out,
                "# REMINDER: tune the stallguard thresholds in the sensorless-*.cfg files before homing"
            );
        }
        let _ = writeln!(
            out,
            "# REMINDER: run PID_CALIBRATE for every heater and SAVE_CONFIG"
        );
        out
    }

    fn sensorless_axes(&self, axis: HomingAxis) -> ConfigResult<Vec<SensorlessAxis>> {
        let axes: Vec<PrinterAxis> = match axis {
            HomingAxis::X => self
                .tools
                .iter()
                .filter(|t| t.toolhead.x_endstop == EndstopKind::Sensorless)
                .map(|t| carriage_axis(t.toolhead))
                .collect(),
            HomingAxis::Y => {
                let homed = self
                    .tools
                    .iter()
                    .any(|t| t.toolhead.y_endstop == EndstopKind::Sensorless);
                if homed {
                    vec![PrinterAxis::Y, PrinterAxis::Y1]
                } else {
                    Vec::new()
                }
            }
        };

        axes.into_iter()
            .filter_map(|a| self.motor(a))
            .map(|motor| {
                let diag = motor.slot.diag_pin.as_ref().ok_or_else(|| {
                    ConfiguratorError::InconsistentHardware(format!(
                        "{} has no diag pin for sensorless homing of axis {}",
                        self.config.controlboard.name, motor.rail.axis
                    ))
                })?;
                let driver_type = motor.rail.driver.driver_type;
                let option = driver_type.stallguard_option().ok_or_else(|| {
                    ConfiguratorError::InconsistentHardware(format!(
                        "{} can't detect stalls for sensorless homing of axis {}",
                        driver_type, motor.rail.axis
                    ))
                })?;
                Ok(SensorlessAxis {
                    stepper: motor.rail.axis.stepper_section(),
                    driver: driver_type.as_str().to_string(),
                    driver_section: motor.driver_section(),
                    diag_pin: format!("^{}", motor.pin(diag)),
                    threshold_option: option,
                    threshold: Self::stall_threshold(option),
                    virtual_endstop: virtual_endstop(motor),
                    homing_current: format!(
                        "{:.2}",
                        motor.rail.current * axis.homing_current_factor()
                    ),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::sample_configuration;

    #[test]
    fn test_missing_motor_slot_is_inconsistent() {
        let mut config = sample_configuration();
        config.controlboard.motor_slots.remove(&PrinterAxis::Z);
        match KlipperConfigHelper::new(&config) {
            Err(ConfiguratorError::InconsistentHardware(msg)) => assert!(msg.contains("axis z")),
            other => panic!("expected inconsistent hardware, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_motor_sections() {
        let config = sample_configuration();
        let helper = KlipperConfigHelper::new(&config).unwrap();
        let sections = helper.render_motor_sections();
        assert!(sections.contains("[stepper_x]\nstep_pin: PF13\n"));
        assert!(sections.contains("[tmc2209 stepper_x]\nuart_pin: PC4\nrun_current: 1.100\n"));
        assert!(sections.contains("microsteps: 64"));
    }

    #[test]
    fn test_sensorless_axes() {
        let mut config = sample_configuration();
        let helper = KlipperConfigHelper::new(&config).unwrap();
        assert!(helper.sensorless_axes(HomingAxis::X).unwrap().is_empty());

        config.toolheads[0].x_endstop = EndstopKind::Sensorless;
        let helper = KlipperConfigHelper::new(&config).unwrap();
        let axes = helper.sensorless_axes(HomingAxis::X).unwrap();
        assert_eq!(axes.len(), 1);
        assert_eq!(axes[0].virtual_endstop, "tmc2209_stepper_x:virtual_endstop");
        assert_eq!(axes[0].threshold_option, "driver_SGTHRS");
        assert_eq!(axes[0].diag_pin, "^PG6");
        assert!(helper
            .render_endstop_section()
            .contains("endstop_pin: tmc2209_stepper_x:virtual_endstop"));
    }

    #[test]
    fn test_user_stepper_sections_follow_rails() {
        let config = sample_configuration();
        let helper = KlipperConfigHelper::new(&config).unwrap();
        let family = crate::generator::families::families()
            .into_iter()
            .find(|f| f.id == "v-core")
            .unwrap();
        let sections = helper.render_user_stepper_sections(family.user_steppers(), family.margin);
        assert!(sections.contains("[stepper_x]\ndir_pin: PF12\n"));
        assert!(sections.contains("position_max: 300"));
        assert!(!sections.contains("[stepper_z1]"));
    }

    #[test]
    fn test_sensorless_axis_without_diag_pin_is_inconsistent() {
        let mut config = sample_configuration();
        config.toolheads[0].x_endstop = EndstopKind::Sensorless;
        if let Some(slot) = config.controlboard.motor_slots.get_mut(&PrinterAxis::X) {
            slot.diag_pin = None;
        }
        let helper = KlipperConfigHelper::new(&config).unwrap();
        match helper.sensorless_axes(HomingAxis::X) {
            Err(ConfiguratorError::InconsistentHardware(msg)) => assert!(msg.contains("axis x")),
            other => panic!("expected inconsistent hardware, got {:?}", other.map(|a| a.len())),
        }
        assert!(!helper
            .render_reminders()
            .contains("tune the stallguard thresholds"));
    }

    #[test]
    fn test_stealthchop_threshold_follows_mode() {
        let mut config = sample_configuration();
        let helper = KlipperConfigHelper::new(&config).unwrap();
        assert!(helper
            .render_motor_sections()
            .contains("stealthchop_threshold: 0\n"));

        config.standstill_stealth = true;
        let helper = KlipperConfigHelper::new(&config).unwrap();
        assert!(helper
            .render_motor_sections()
            .contains("stealthchop_threshold: 1\n"));

        config.stealthchop = true;
        let helper = KlipperConfigHelper::new(&config).unwrap();
        assert!(helper
            .render_motor_sections()
            .contains("stealthchop_threshold: 999999\n"));
    }
}
