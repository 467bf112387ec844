use serde::{Deserialize, Serialize};

use super::hardware::{Driver, Stepper};
use super::motion::PrinterAxis;

/// Stepper and driver assignment for one axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rail {
    pub axis: PrinterAxis,
    pub driver: Driver,
    pub stepper: Stepper,
    pub voltage: u32,
    pub current: f64,
}

impl Rail {
    pub fn serialize(&self) -> SerializedRail {
        SerializedRail {
            axis: self.axis,
            driver: self.driver.id.clone(),
            stepper: self.stepper.id.clone(),
            voltage: self.voltage,
            current: self.current,
        }
    }

    /// Whether the motor runs hot enough to warrant active driver cooling
    pub fn needs_cooling(&self) -> bool {
        self.current >= self.driver.cooling_current_threshold
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedRail {
    pub axis: PrinterAxis,
    pub driver: String,
    pub stepper: String,
    pub voltage: u32,
    pub current: f64,
}
