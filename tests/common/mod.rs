//! On-disk catalog fixtures shared by the integration tests

#![allow(dead_code)]

use printer_configurator::config::{ArtifactStore, CatalogCache, ConfiguratorSettings, PersistenceConfig};
use printer_configurator::{
    Configurator, EndstopKind, FanPort, PrinterAxis, SerializedPrinterConfiguration,
    SerializedRail, SerializedToolheadConfiguration,
};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

pub const OCTOPUS: &str = "btt-octopus-11";
pub const SKR_MINI: &str = "btt-skr-mini-e3-v3";
pub const EBB: &str = "btt-ebb42-12";

/// A catalog, config directory and data directory inside one temp dir
pub struct Fixture {
    pub dir: TempDir,
    pub settings: ConfiguratorSettings,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = ConfiguratorSettings::rooted_at(dir.path());
        write_catalog(&settings.configuration_path);
        Self { dir, settings }
    }

    pub fn cache(&self) -> CatalogCache {
        CatalogCache::from_directory(&self.settings.configuration_path)
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(PersistenceConfig::from(&self.settings))
    }

    pub fn configurator(&self) -> Configurator {
        Configurator::new(self.settings.clone()).unwrap()
    }

    pub fn config_dir(&self) -> &Path {
        &self.settings.klipper_config_path
    }
}

fn write(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn write_json(path: &Path, value: serde_json::Value) {
    write(path, &serde_json::to_string_pretty(&value).unwrap());
}

fn motor_slot(step: &str, dir: &str, enable: &str, uart: &str, diag: Option<&str>) -> serde_json::Value {
    let mut slot = json!({
        "stepPin": step,
        "dirPin": dir,
        "enablePin": enable,
        "uartPin": uart,
    });
    if let Some(diag) = diag {
        slot["diagPin"] = json!(diag);
    }
    slot
}

fn write_catalog(root: &Path) {
    write_json(
        &root.join("boards").join(OCTOPUS).join("board-definition.json"),
        json!({
            "name": "BTT Octopus v1.1",
            "manufacturer": "BigTreeTech",
            "serialPath": "/dev/btt-octopus-11",
            "motorSlots": {
                "x": motor_slot("PF13", "PF12", "PF14", "PC4", Some("PG6")),
                "y": motor_slot("PG0", "PG1", "PF15", "PD11", Some("PG9")),
                "z": motor_slot("PF11", "PG3", "PG5", "PC6", None),
                "z1": motor_slot("PG4", "PC1", "PA0", "PC7", None),
                "z2": motor_slot("PF9", "PF10", "PG2", "PF2", None),
                "extruder": motor_slot("PF7", "PF6", "PF8", "PE4", None),
            },
            "endstopPins": { "x": "PG6", "y": "PG9" },
            "fans": {
                "tools": [
                    { "part2pin": "PA8", "hotend2pin": "PE5" },
                    { "part2pin": "PD12", "hotend2pin": "PD13" }
                ],
                "controller2pin": "PD14"
            },
            "probePin": "PB7",
            "extruderHeaters": [
                { "heaterPin": "PA2", "sensorPin": "PF4" },
                { "heaterPin": "PA3", "sensorPin": "PF5" }
            ],
            "bedHeater": { "heaterPin": "PA1", "sensorPin": "PF3" }
        }),
    );

    // Integrated TMC2208 drivers: the diag pins are wired but can't detect stalls
    let mut skr_x = motor_slot("PB13", "PB12", "PB14", "PC11", Some("PC0"));
    skr_x["integratedDriver"] = json!("TMC2208");
    let mut skr_y = motor_slot("PB10", "PB2", "PB11", "PC11", Some("PC1"));
    skr_y["integratedDriver"] = json!("TMC2208");
    write_json(
        &root.join("boards").join(SKR_MINI).join("board-definition.json"),
        json!({
            "name": "BTT SKR Mini E3 V3",
            "manufacturer": "BigTreeTech",
            "motorSlots": {
                "x": skr_x,
                "y": skr_y,
                "z": motor_slot("PB0", "PC5", "PB1", "PC11", None),
                "extruder": motor_slot("PB3", "PB4", "PD1", "PC11", None),
            },
            "endstopPins": { "x": "PC0", "y": "PC1" },
            "fans": {
                "tools": [{ "part2pin": "PC6", "hotend2pin": "PB15" }],
                "controller2pin": "PC7"
            },
            "extruderHeaters": [{ "heaterPin": "PC8", "sensorPin": "PA0" }],
            "bedHeater": { "heaterPin": "PC9", "sensorPin": "PC4" }
        }),
    );

    write_json(
        &root.join("boards").join(EBB).join("board-definition.json"),
        json!({
            "name": "BTT EBB42 v1.2",
            "manufacturer": "BigTreeTech",
            "isToolboard": true,
            "motorSlots": {
                "extruder": motor_slot("PD0", "PD1", "PD2", "PA15", None),
            },
            "endstopPins": { "x": "PB6" },
            "fans": {
                "tools": [{ "part2pin": "PA0", "hotend2pin": "PA1" }]
            },
            "accelerometer": { "chip": "adxl345", "csPin": "PB12", "spiBus": "spi2" },
            "extruderHeaters": [{ "heaterPin": "PB13", "sensorPin": "PA3" }]
        }),
    );

    write(
        &root.join("hotends").join("rapido.cfg"),
        "#@ title = \"Phaetus Rapido\"\n#@ thermistor = \"ATC Semitec 104NT-4-R025H42G\"\n#@ max_temp = 300\n[extruder]\nmax_temp: 300\n",
    );
    write(
        &root.join("hotends").join("dragon.cfg"),
        "#@ title = \"Phaetus Dragon\"\n#@ thermistor = \"ATC Semitec 104GT-2\"\n[extruder]\n",
    );
    // No metadata, not a catalog entry
    write(&root.join("hotends").join("notes.cfg"), "[extruder]\nmax_temp: 260\n");

    write(
        &root.join("extruders").join("orbiter-2.cfg"),
        "#@ title = \"LDO Orbiter 2.0\"\n#@ stepper = \"LDO-36STH20-1004AHG\"\n#@ current = 0.85\n[extruder]\n",
    );
    write(
        &root.join("z-probe").join("bltouch.cfg"),
        "#@ title = \"BLTouch\"\n#@ uses_probe_pin = true\n[bltouch]\n",
    );

    write_json(
        &root.join("printers").join("v-core-3").join("printer-definition.json"),
        printer_definition(
            "V-Core 3",
            "Rat Rig",
            "v-core-printer.template.cfg",
            &[300, 400, 500],
        ),
    );
    write_json(
        &root.join("printers").join("hyperion").join("printer-definition.json"),
        printer_definition(
            "Hyperion",
            "Acme",
            "hyperion-printer.template.cfg",
            &[300],
        ),
    );
}

fn printer_definition(name: &str, manufacturer: &str, template: &str, sizes: &[u32]) -> serde_json::Value {
    json!({
        "name": name,
        "description": format!("{} CoreXY", name),
        "manufacturer": manufacturer,
        "kinematics": "corexy",
        "sizes": sizes,
        "template": template,
        "defaults": {
            "controlboard": OCTOPUS,
            "toolheads": [{
                "tool": 0,
                "hotend": "rapido.cfg",
                "extruder": "orbiter-2.cfg",
                "xEndstop": "endstop",
                "yEndstop": "endstop",
                "partFan": "2pin",
                "hotendFan": "2pin"
            }],
            "rails": [
                { "axis": "x", "driver": "BTT-TMC2209-13", "stepper": "LDO-42STH48-2504AC", "voltage": 24, "current": 1.1 },
                { "axis": "y", "driver": "BTT-TMC2209-13", "stepper": "LDO-42STH48-2504AC", "voltage": 24, "current": 1.1 },
                { "axis": "z", "driver": "BTT-TMC2209-13", "stepper": "LDO-42STH48-2504AC", "voltage": 24, "current": 1.1 },
                { "axis": "extruder", "driver": "BTT-TMC2209-13", "stepper": "LDO-36STH20-1004AHG", "voltage": 24, "current": 0.85 }
            ],
            "controllerFan": "2pin"
        }
    })
}

fn rail(axis: PrinterAxis, stepper: &str, current: f64) -> SerializedRail {
    SerializedRail {
        axis,
        driver: "BTT-TMC2209-13".to_string(),
        stepper: stepper.to_string(),
        voltage: 24,
        current,
    }
}

pub fn toolhead() -> SerializedToolheadConfiguration {
    SerializedToolheadConfiguration {
        tool: 0,
        axis: None,
        hotend: "rapido.cfg".to_string(),
        extruder: "orbiter-2.cfg".to_string(),
        probe: Some("bltouch.cfg".to_string()),
        thermistor: None,
        x_endstop: EndstopKind::Endstop,
        y_endstop: EndstopKind::Endstop,
        x_accelerometer: None,
        y_accelerometer: None,
        toolboard: None,
        part_fan: FanPort::TwoPin,
        hotend_fan: FanPort::TwoPin,
        nozzle: None,
    }
}

/// Stored V-Core 3 configuration on the Octopus fixture board
pub fn v_core() -> SerializedPrinterConfiguration {
    SerializedPrinterConfiguration {
        printer: "v-core-3".to_string(),
        size: Some(400),
        controlboard: OCTOPUS.to_string(),
        toolheads: vec![toolhead()],
        rails: vec![
            rail(PrinterAxis::X, "LDO-42STH48-2504AC", 1.1),
            rail(PrinterAxis::Y, "LDO-42STH48-2504AC", 1.1),
            rail(PrinterAxis::Z, "LDO-42STH48-2504AC", 1.1),
            rail(PrinterAxis::Extruder, "LDO-36STH20-1004AHG", 0.85),
        ],
        controller_fan: Some(FanPort::TwoPin),
        performance_mode: false,
        stealthchop: false,
        standstill_stealth: false,
    }
}
