//! Benchmarks for resolution, option queries and rendering
//!
//! Covers the request path of the configurator: resolving stored IDs,
//! answering option queries while a user edits a selection, and rendering.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use printer_configurator::config::{CatalogCache, StaticCatalog};
use printer_configurator::generator::Generator;
use printer_configurator::{
    resolve_full, resolve_partial, Board, EndstopKind, Extruder, Hotend, OptionQuery,
    PrinterDefinition, SerializedPartialPrinterConfiguration, SerializedPrinterConfiguration,
    ToolSelector,
};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_runtime() -> Runtime {
    Runtime::new().expect("Failed to create Tokio runtime")
}

fn slot(step: &str, dir: &str, enable: &str, uart: &str, diag: Option<&str>) -> serde_json::Value {
    json!({
        "stepPin": step,
        "dirPin": dir,
        "enablePin": enable,
        "uartPin": uart,
        "diagPin": diag,
    })
}

fn create_catalog() -> CatalogCache {
    let board: Board = serde_json::from_value(json!({
        "id": "btt-octopus-11",
        "name": "BTT Octopus v1.1",
        "manufacturer": "BigTreeTech",
        "motorSlots": {
            "x": slot("PF13", "PF12", "PF14", "PC4", Some("PG6")),
            "y": slot("PG0", "PG1", "PF15", "PD11", Some("PG9")),
            "z": slot("PF11", "PG3", "PG5", "PC6", None),
            "z1": slot("PG4", "PC1", "PA0", "PC7", None),
            "z2": slot("PF9", "PF10", "PG2", "PF2", None),
            "extruder": slot("PF7", "PF6", "PF8", "PE4", None),
        },
        "endstopPins": { "x": "PG6", "y": "PG9" },
        "fans": {
            "tools": [{ "part2pin": "PA8", "hotend2pin": "PE5" }],
            "controller2pin": "PD14"
        },
        "probePin": "PB7",
        "extruderHeaters": [{ "heaterPin": "PA2", "sensorPin": "PF4" }],
        "bedHeater": { "heaterPin": "PA1", "sensorPin": "PF3" }
    }))
    .expect("valid board");

    let rail = |axis: &str, stepper: &str, current: f64| {
        json!({ "axis": axis, "driver": "BTT-TMC2209-13", "stepper": stepper, "voltage": 24, "current": current })
    };
    let printer: PrinterDefinition = serde_json::from_value(json!({
        "id": "v-core-3",
        "name": "V-Core 3",
        "description": "CoreXY",
        "manufacturer": "Rat Rig",
        "kinematics": "corexy",
        "sizes": [300, 400, 500],
        "template": "v-core-printer.template.cfg",
        "defaults": {
            "controlboard": "btt-octopus-11",
            "toolheads": [{
                "tool": 0,
                "hotend": "rapido.cfg",
                "extruder": "orbiter-2.cfg",
                "xEndstop": "sensorless",
                "yEndstop": "sensorless",
                "partFan": "2pin",
                "hotendFan": "2pin"
            }],
            "rails": [
                rail("x", "LDO-42STH48-2504AC", 1.1),
                rail("y", "LDO-42STH48-2504AC", 1.1),
                rail("z", "LDO-42STH48-2504AC", 1.1),
                rail("extruder", "LDO-36STH20-1004AHG", 0.85)
            ]
        }
    }))
    .expect("valid printer");

    let catalog = StaticCatalog::new()
        .with_boards(vec![board])
        .with_printers(vec![printer])
        .with_hotends(vec![Hotend {
            id: "rapido.cfg".to_string(),
            title: "Phaetus Rapido".to_string(),
            thermistor: "ATC Semitec 104NT-4-R025H42G".to_string(),
            max_temp: Some(300),
        }])
        .with_extruders(vec![Extruder {
            id: "orbiter-2.cfg".to_string(),
            title: "LDO Orbiter 2.0".to_string(),
            stepper: "LDO-36STH20-1004AHG".to_string(),
            current: 0.85,
            rotation_distance: None,
        }]);
    CatalogCache::new(Arc::new(catalog))
}

fn stored_configuration(rt: &Runtime, cache: &CatalogCache) -> SerializedPrinterConfiguration {
    let printer = rt
        .block_on(cache.printers())
        .expect("printers")
        .first()
        .cloned()
        .expect("one printer");
    printer_configurator::default_configuration(&printer)
}

fn bench_resolution(c: &mut Criterion) {
    let rt = create_runtime();
    let cache = create_catalog();
    let stored = stored_configuration(&rt, &cache);

    c.bench_function("resolve_full", |b| {
        b.to_async(&rt).iter(|| async {
            black_box(resolve_full(black_box(&stored), &cache).await.expect("resolves"))
        })
    });

    let partial: SerializedPartialPrinterConfiguration = stored.clone().into();
    c.bench_function("resolve_partial", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(resolve_partial(&partial, &cache).await.expect("resolves")) })
    });
}

fn bench_option_queries(c: &mut Criterion) {
    let rt = create_runtime();
    let cache = create_catalog();
    let stored = stored_configuration(&rt, &cache);
    let stored: SerializedPartialPrinterConfiguration = stored.into();
    let partial = rt
        .block_on(resolve_partial(&stored, &cache))
        .expect("resolves");
    let toolhead = partial.toolhead(ToolSelector::Tool(0));

    let mut group = c.benchmark_group("option_queries");
    for query in OptionQuery::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, query| {
            b.iter(|| black_box(query.resolve(&partial, toolhead)))
        });
    }
    group.finish();
}

fn bench_rendering(c: &mut Criterion) {
    let rt = create_runtime();
    let cache = create_catalog();
    let generator = Generator::new().expect("templates compile");

    let mut group = c.benchmark_group("render_files");
    for (name, endstop) in [
        ("endstops", EndstopKind::Endstop),
        ("sensorless", EndstopKind::Sensorless),
    ] {
        let mut stored = stored_configuration(&rt, &cache);
        stored.toolheads[0].x_endstop = endstop;
        stored.toolheads[0].y_endstop = endstop;
        let config = rt
            .block_on(resolve_full(&stored, &cache))
            .expect("resolves");

        group.bench_with_input(BenchmarkId::from_parameter(name), &config, |b, config| {
            b.iter(|| black_box(generator.render_files(config).expect("renders")))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_resolution,
    bench_option_queries,
    bench_rendering
);
criterion_main!(benches);
