//! Resolved configurations shared by the generator unit tests

use std::collections::BTreeMap;

use crate::data::{find_driver, find_stepper};
use crate::models::*;

fn slot(step: &str, dir: &str, enable: &str, uart: &str, diag: Option<&str>) -> MotorSlot {
    MotorSlot {
        step_pin: step.to_string(),
        dir_pin: dir.to_string(),
        enable_pin: enable.to_string(),
        uart_pin: Some(uart.to_string()),
        cs_pin: None,
        diag_pin: diag.map(str::to_string),
        integrated_driver: None,
    }
}

fn heater(heater_pin: &str, sensor_pin: &str) -> HeaterPins {
    HeaterPins {
        heater_pin: heater_pin.to_string(),
        sensor_pin: sensor_pin.to_string(),
    }
}

pub fn octopus() -> Board {
    let mut motor_slots = BTreeMap::new();
    motor_slots.insert(PrinterAxis::X, slot("PF13", "PF12", "PF14", "PC4", Some("PG6")));
    motor_slots.insert(PrinterAxis::Y, slot("PG0", "PG1", "PF15", "PD11", Some("PG9")));
    motor_slots.insert(PrinterAxis::Z, slot("PF11", "PG3", "PG5", "PC6", None));
    motor_slots.insert(PrinterAxis::Z1, slot("PG4", "PC1", "PA0", "PC7", None));
    motor_slots.insert(PrinterAxis::Z2, slot("PF9", "PF10", "PG2", "PF2", None));
    motor_slots.insert(PrinterAxis::Extruder, slot("PF7", "PF6", "PF8", "PE4", None));

    let mut endstop_pins = BTreeMap::new();
    endstop_pins.insert(PrinterAxis::X, "PG6".to_string());
    endstop_pins.insert(PrinterAxis::Y, "PG9".to_string());

    Board {
        id: "btt-octopus-11".to_string(),
        name: "BTT Octopus v1.1".to_string(),
        manufacturer: "BigTreeTech".to_string(),
        is_toolboard: false,
        is_host: false,
        serial_path: Some("/dev/btt-octopus-11".to_string()),
        documentation_link: None,
        motor_slots,
        endstop_pins,
        fans: BoardFans {
            tools: vec![
                ToolFanHeaders {
                    part_2pin: Some("PA8".to_string()),
                    part_4pin: None,
                    hotend_2pin: Some("PE5".to_string()),
                },
                ToolFanHeaders {
                    part_2pin: Some("PD12".to_string()),
                    part_4pin: None,
                    hotend_2pin: Some("PD13".to_string()),
                },
            ],
            controller_2pin: Some("PD14".to_string()),
            controller_4pin: None,
        },
        accelerometer: None,
        probe_pin: Some("PB7".to_string()),
        extruder_heaters: vec![heater("PA2", "PF4"), heater("PA3", "PF5")],
        bed_heater: Some(heater("PA1", "PF3")),
    }
}

fn rail(axis: PrinterAxis) -> Rail {
    Rail {
        axis,
        driver: find_driver("BTT-TMC2209-13").unwrap().clone(),
        stepper: find_stepper("LDO-42STH48-2504AC").unwrap().clone(),
        voltage: 24,
        current: 1.1,
    }
}

fn toolhead(tool_number: u8, axis: ToolAxis) -> ToolheadConfiguration {
    ToolheadConfiguration {
        tool_number,
        axis,
        hotend: Hotend {
            id: "rapido.cfg".to_string(),
            title: "Phaetus Rapido".to_string(),
            thermistor: "ATC Semitec 104NT-4-R025H42G".to_string(),
            max_temp: Some(300),
        },
        extruder: Extruder {
            id: "orbiter-2.cfg".to_string(),
            title: "LDO Orbiter 2.0".to_string(),
            stepper: "LDO-36STH20-1004AHG".to_string(),
            current: 0.85,
            rotation_distance: None,
        },
        probe: None,
        thermistor: "ATC Semitec 104NT-4-R025H42G".to_string(),
        x_endstop: EndstopKind::Endstop,
        y_endstop: EndstopKind::Endstop,
        x_accelerometer: AccelerometerKind::Rpi,
        y_accelerometer: AccelerometerKind::Rpi,
        toolboard: None,
        part_fan: FanPort::TwoPin,
        hotend_fan: FanPort::TwoPin,
        nozzle: Nozzle {
            nozzle_type: NozzleType::Regular,
            diameter: 0.4,
        },
    }
}

fn printer(id: &str, name: &str, kinematics: Kinematics, template: &str) -> PrinterDefinition {
    PrinterDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: name.to_string(),
        manufacturer: "Rat Rig".to_string(),
        documentation_link: None,
        image: None,
        kinematics,
        sizes: vec![300, 400, 500],
        template: template.to_string(),
        defaults: PrinterDefaults {
            controlboard: "btt-octopus-11".to_string(),
            toolheads: Vec::new(),
            rails: Vec::new(),
            controller_fan: FanPort::TwoPin,
        },
    }
}

/// Single-tool V-Core on an Octopus
pub fn sample_configuration() -> PrinterConfiguration {
    PrinterConfiguration {
        printer: printer("v-core-3", "V-Core 3", Kinematics::Corexy, "v-core-printer.template.cfg"),
        size: BuildSize::cube(300),
        controlboard: octopus(),
        toolheads: vec![toolhead(0, ToolAxis::X)],
        rails: [PrinterAxis::X, PrinterAxis::Y, PrinterAxis::Z, PrinterAxis::Extruder]
            .into_iter()
            .map(rail)
            .collect(),
        controller_fan: FanPort::TwoPin,
        performance_mode: false,
        stealthchop: false,
        standstill_stealth: false,
    }
}

/// Two-tool IDEX on an Octopus with the dual carriage and second extruder wired
pub fn caramba_configuration() -> PrinterConfiguration {
    let mut board = octopus();
    board
        .motor_slots
        .insert(PrinterAxis::DualCarriage, slot("PC13", "PF0", "PF1", "PE2", Some("PG10")));
    board
        .motor_slots
        .insert(PrinterAxis::Y1, slot("PE2", "PE3", "PD4", "PE1", None));
    board
        .motor_slots
        .insert(PrinterAxis::Extruder1, slot("PE6", "PA14", "PE0", "PD3", None));

    PrinterConfiguration {
        printer: printer(
            "caramba-hybrid",
            "Caramba Hybrid IDEX",
            Kinematics::Idex,
            "caramba-idex-printer.template.cfg",
        ),
        size: BuildSize::cube(400),
        controlboard: board,
        toolheads: vec![toolhead(0, ToolAxis::X), toolhead(1, ToolAxis::DualCarriage)],
        rails: [
            PrinterAxis::X,
            PrinterAxis::DualCarriage,
            PrinterAxis::Y,
            PrinterAxis::Y1,
            PrinterAxis::Z,
            PrinterAxis::Z1,
            PrinterAxis::Z2,
            PrinterAxis::Extruder,
            PrinterAxis::Extruder1,
        ]
        .into_iter()
        .map(rail)
        .collect(),
        controller_fan: FanPort::TwoPin,
        performance_mode: true,
        stealthchop: false,
        standstill_stealth: false,
    }
}
