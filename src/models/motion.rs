//! Kinematic axes, carriages and build volume

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stepper-driven axis of the printer, including extruder motors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterAxis {
    X,
    X1,
    DualCarriage,
    Y,
    Y1,
    Z,
    Z1,
    Z2,
    Z3,
    Extruder,
    Extruder1,
}

impl PrinterAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrinterAxis::X => "x",
            PrinterAxis::X1 => "x1",
            PrinterAxis::DualCarriage => "dual_carriage",
            PrinterAxis::Y => "y",
            PrinterAxis::Y1 => "y1",
            PrinterAxis::Z => "z",
            PrinterAxis::Z1 => "z1",
            PrinterAxis::Z2 => "z2",
            PrinterAxis::Z3 => "z3",
            PrinterAxis::Extruder => "extruder",
            PrinterAxis::Extruder1 => "extruder1",
        }
    }

    /// Klipper section name of the stepper driving this axis
    pub fn stepper_section(&self) -> String {
        match self {
            PrinterAxis::DualCarriage | PrinterAxis::Extruder | PrinterAxis::Extruder1 => {
                self.as_str().to_string()
            }
            other => format!("stepper_{}", other.as_str()),
        }
    }

    pub fn is_extruder(&self) -> bool {
        matches!(self, PrinterAxis::Extruder | PrinterAxis::Extruder1)
    }

    /// Tool index an extruder axis belongs to
    pub fn extruder_tool(&self) -> Option<u8> {
        match self {
            PrinterAxis::Extruder => Some(0),
            PrinterAxis::Extruder1 => Some(1),
            _ => None,
        }
    }
}

impl fmt::Display for PrinterAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The carriage a toolhead rides on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolAxis {
    #[default]
    X,
    DualCarriage,
}

impl ToolAxis {
    /// Index of the tool normally mounted on this carriage
    pub fn tool_index(&self) -> usize {
        match self {
            ToolAxis::X => 0,
            ToolAxis::DualCarriage => 1,
        }
    }

    pub fn printer_axis(&self) -> PrinterAxis {
        match self {
            ToolAxis::X => PrinterAxis::X,
            ToolAxis::DualCarriage => PrinterAxis::DualCarriage,
        }
    }

    pub fn extruder_axis(&self) -> PrinterAxis {
        match self {
            ToolAxis::X => PrinterAxis::Extruder,
            ToolAxis::DualCarriage => PrinterAxis::Extruder1,
        }
    }
}

/// Identifies a toolhead either by tool number or by carriage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSelector {
    Tool(u8),
    Axis(ToolAxis),
}

impl Default for ToolSelector {
    fn default() -> Self {
        ToolSelector::Tool(0)
    }
}

impl FromStr for ToolSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "x" => Ok(ToolSelector::Axis(ToolAxis::X)),
            "dual_carriage" | "dual-carriage" => Ok(ToolSelector::Axis(ToolAxis::DualCarriage)),
            other => other
                .trim_start_matches('t')
                .parse::<u8>()
                .map(ToolSelector::Tool)
                .map_err(|_| format!("Invalid tool selector: {}", s)),
        }
    }
}

/// Printer motion system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kinematics {
    Cartesian,
    Corexy,
    HybridCorexy,
    Idex,
}

impl Kinematics {
    /// Value of the `kinematics:` option in the `[printer]` section
    pub fn klipper_name(&self) -> &'static str {
        match self {
            Kinematics::Cartesian | Kinematics::Idex => "cartesian",
            Kinematics::Corexy => "corexy",
            Kinematics::HybridCorexy => "hybrid_corexy",
        }
    }
}

/// Build volume in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildSize {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl BuildSize {
    pub fn cube(edge: u32) -> Self {
        Self {
            x: edge,
            y: edge,
            z: edge,
        }
    }
}

impl fmt::Display for BuildSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}
