//! Configuration aggregate and its stored projections

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::hardware::Board;
use super::motion::{BuildSize, PrinterAxis, ToolAxis, ToolSelector};
use super::options::FanPort;
use super::printer::PrinterDefinition;
use super::rail::{Rail, SerializedRail};
use super::toolhead::{
    PartialToolheadConfiguration, SerializedPartialToolheadConfiguration,
    SerializedToolheadConfiguration, ToolheadConfiguration,
};
use crate::{ConfigResult, ConfiguratorError};

/// Most toolheads a printer may carry
pub const MAX_TOOLHEADS: usize = 2;

/// A fully resolved, validated printer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterConfiguration {
    pub printer: PrinterDefinition,
    pub size: BuildSize,
    pub controlboard: Board,
    pub toolheads: Vec<ToolheadConfiguration>,
    pub rails: Vec<Rail>,
    pub controller_fan: FanPort,
    pub performance_mode: bool,
    pub stealthchop: bool,
    pub standstill_stealth: bool,
}

impl PrinterConfiguration {
    pub fn toolhead(&self, selector: ToolSelector) -> Option<&ToolheadConfiguration> {
        self.toolheads.iter().find(|t| t.matches(selector))
    }

    pub fn rail(&self, axis: PrinterAxis) -> Option<&Rail> {
        self.rails.iter().find(|r| r.axis == axis)
    }

    pub fn is_multi_tool(&self) -> bool {
        self.toolheads.len() > 1
    }

    pub fn serialize(&self) -> SerializedPrinterConfiguration {
        SerializedPrinterConfiguration {
            printer: self.printer.id.clone(),
            size: Some(self.size.x),
            controlboard: self.controlboard.id.clone(),
            toolheads: self.toolheads.iter().map(|t| t.serialize()).collect(),
            rails: self.rails.iter().map(|r| r.serialize()).collect(),
            controller_fan: Some(self.controller_fan),
            performance_mode: self.performance_mode,
            stealthchop: self.stealthchop,
            standstill_stealth: self.standstill_stealth,
        }
    }
}

/// Best-effort configuration; unresolved references are `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PartialPrinterConfiguration {
    pub printer: Option<PrinterDefinition>,
    pub size: Option<BuildSize>,
    pub controlboard: Option<Board>,
    pub toolheads: Vec<PartialToolheadConfiguration>,
    pub rails: Vec<Rail>,
    pub controller_fan: Option<FanPort>,
    pub performance_mode: bool,
    pub stealthchop: bool,
    pub standstill_stealth: bool,
}

impl PartialPrinterConfiguration {
    pub fn toolhead(&self, selector: ToolSelector) -> Option<&PartialToolheadConfiguration> {
        self.toolheads.iter().find(|t| match selector {
            ToolSelector::Tool(number) => t.tool_number == number,
            ToolSelector::Axis(axis) => t.axis == axis,
        })
    }

    pub fn serialize(&self) -> SerializedPartialPrinterConfiguration {
        SerializedPartialPrinterConfiguration {
            printer: self.printer.as_ref().map(|p| p.id.clone()),
            size: self.size.map(|s| s.x),
            controlboard: self.controlboard.as_ref().map(|b| b.id.clone()),
            toolheads: self.toolheads.iter().map(|t| t.serialize()).collect(),
            rails: self.rails.iter().map(|r| r.serialize()).collect(),
            controller_fan: self.controller_fan,
            performance_mode: self.performance_mode,
            stealthchop: self.stealthchop,
            standstill_stealth: self.standstill_stealth,
        }
    }
}

impl From<&PrinterConfiguration> for PartialPrinterConfiguration {
    fn from(config: &PrinterConfiguration) -> Self {
        Self {
            printer: Some(config.printer.clone()),
            size: Some(config.size),
            controlboard: Some(config.controlboard.clone()),
            toolheads: config.toolheads.iter().map(Into::into).collect(),
            rails: config.rails.clone(),
            controller_fan: Some(config.controller_fan),
            performance_mode: config.performance_mode,
            stealthchop: config.stealthchop,
            standstill_stealth: config.standstill_stealth,
        }
    }
}

/// ID-only configuration as stored in the last-applied snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPrinterConfiguration {
    pub printer: String,
    /// Cubic build size; the printer's first size when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    pub controlboard: String,
    pub toolheads: Vec<SerializedToolheadConfiguration>,
    pub rails: Vec<SerializedRail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_fan: Option<FanPort>,
    #[serde(default)]
    pub performance_mode: bool,
    #[serde(default)]
    pub stealthchop: bool,
    /// Spreadcycle while moving, stealthchop held at standstill
    #[serde(default)]
    pub standstill_stealth: bool,
}

impl From<SerializedPrinterConfiguration> for SerializedPartialPrinterConfiguration {
    fn from(config: SerializedPrinterConfiguration) -> Self {
        Self {
            printer: Some(config.printer),
            size: config.size,
            controlboard: Some(config.controlboard),
            toolheads: config.toolheads.into_iter().map(Into::into).collect(),
            rails: config.rails,
            controller_fan: config.controller_fan,
            performance_mode: config.performance_mode,
            stealthchop: config.stealthchop,
            standstill_stealth: config.standstill_stealth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPartialPrinterConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controlboard: Option<String>,
    #[serde(default)]
    pub toolheads: Vec<SerializedPartialToolheadConfiguration>,
    #[serde(default)]
    pub rails: Vec<SerializedRail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller_fan: Option<FanPort>,
    #[serde(default)]
    pub performance_mode: bool,
    #[serde(default)]
    pub stealthchop: bool,
    #[serde(default)]
    pub standstill_stealth: bool,
}

/// Checks tool numbering and carriage assignment of a toolhead set
pub fn validate_toolhead_layout(toolheads: &[(u8, ToolAxis)]) -> ConfigResult<()> {
    if toolheads.is_empty() {
        return Err(ConfiguratorError::Validation(
            "At least one toolhead is required".to_string(),
        ));
    }
    if toolheads.len() > MAX_TOOLHEADS {
        return Err(ConfiguratorError::Validation(format!(
            "At most {} toolheads are supported, got {}",
            MAX_TOOLHEADS,
            toolheads.len()
        )));
    }

    let mut numbers = HashSet::new();
    let mut axes = HashSet::new();
    for (number, axis) in toolheads {
        if !numbers.insert(*number) {
            return Err(ConfiguratorError::Validation(format!(
                "Duplicate toolhead T{}",
                number
            )));
        }
        if !axes.insert(*axis) {
            return Err(ConfiguratorError::Validation(format!(
                "More than one toolhead on the {:?} carriage",
                axis
            )));
        }
    }

    for expected in 0..toolheads.len() as u8 {
        if !numbers.contains(&expected) {
            return Err(ConfiguratorError::Validation(format!(
                "Tool numbers must be contiguous from T0, T{} is missing",
                expected
            )));
        }
    }
    if !axes.contains(&ToolAxis::X) {
        return Err(ConfiguratorError::Validation(
            "A toolhead on the x carriage is required".to_string(),
        ));
    }
    Ok(())
}

/// Checks that rails cover the required axes exactly once
pub fn validate_rail_axes(rails: &[PrinterAxis], required: &[PrinterAxis]) -> ConfigResult<()> {
    let mut seen = HashSet::new();
    for axis in rails {
        if !seen.insert(*axis) {
            return Err(ConfiguratorError::Validation(format!(
                "Duplicate rail for axis {}",
                axis
            )));
        }
        if !required.contains(axis) {
            return Err(ConfiguratorError::Validation(format!(
                "Axis {} is not part of this printer",
                axis
            )));
        }
    }
    if let Some(missing) = required.iter().find(|axis| !seen.contains(*axis)) {
        return Err(ConfiguratorError::Validation(format!(
            "Missing rail for axis {}",
            missing
        )));
    }
    Ok(())
}
