//! Static hardware tables that are not loaded from the catalog

pub mod drivers;

pub use drivers::{drivers, find_driver};

use std::sync::OnceLock;

use crate::models::{Nozzle, NozzleType, Stepper};

fn stepper(id: &str, title: &str, full_steps_per_rotation: u32, max_peak_current: f64) -> Stepper {
    Stepper {
        id: id.to_string(),
        title: title.to_string(),
        full_steps_per_rotation,
        max_peak_current,
    }
}

/// Supported stepper motors
pub fn steppers() -> &'static [Stepper] {
    static STEPPERS: OnceLock<Vec<Stepper>> = OnceLock::new();
    STEPPERS.get_or_init(|| {
        vec![
            stepper("LDO-42STH48-2504AC", "LDO 42STH48-2504AC", 200, 2.5),
            stepper("LDO-42STH48-2804AH", "LDO 42STH48-2804AH", 200, 2.8),
            stepper("LDO-42STH40-1684AC", "LDO 42STH40-1684AC", 200, 1.68),
            stepper("LDO-42STH60-3004AH", "LDO 42STH60-3004AH", 200, 3.0),
            stepper("LDO-36STH20-1004AHG", "LDO 36STH20-1004AHG", 200, 1.0),
            stepper("LDO-42STH25-1404MAC", "LDO 42STH25-1404MAC", 200, 1.4),
            stepper("LDO-42STH48-2004MAH", "LDO 42STH48-2004MAH (0.9 degree)", 400, 2.0),
        ]
    })
}

pub fn find_stepper(id: &str) -> Option<&'static Stepper> {
    steppers().iter().find(|s| s.id == id)
}

/// Klipper sensor types a hotend may declare
pub const THERMISTORS: &[&str] = &[
    "EPCOS 100K B57560G104F",
    "ATC Semitec 104GT-2",
    "ATC Semitec 104NT-4-R025H42G",
    "Generic 3950",
    "Honeywell 100K 135-104LAG-J01",
    "NTC 100K MGB18-104F39050L32",
    "SliceEngineering 450",
    "TDK NTCG104LH104JT1",
    "PT1000",
];

pub fn is_known_thermistor(name: &str) -> bool {
    THERMISTORS.contains(&name)
}

/// Nozzle used when a toolhead does not specify one
pub fn default_nozzle() -> Nozzle {
    Nozzle {
        nozzle_type: NozzleType::Regular,
        diameter: 0.4,
    }
}
