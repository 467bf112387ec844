use serde::{Deserialize, Serialize};

use super::hardware::{Board, Extruder, Hotend, Nozzle, Probe};
use super::motion::{ToolAxis, ToolSelector};
use super::options::{AccelerometerKind, EndstopKind, FanPort};

/// Fully resolved hardware of one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolheadConfiguration {
    pub tool_number: u8,
    pub axis: ToolAxis,
    pub hotend: Hotend,
    pub extruder: Extruder,
    pub probe: Option<Probe>,
    pub thermistor: String,
    pub x_endstop: EndstopKind,
    pub y_endstop: EndstopKind,
    pub x_accelerometer: AccelerometerKind,
    pub y_accelerometer: AccelerometerKind,
    pub toolboard: Option<Board>,
    pub part_fan: FanPort,
    pub hotend_fan: FanPort,
    pub nozzle: Nozzle,
}

impl ToolheadConfiguration {
    pub fn name(&self) -> String {
        format!("T{}", self.tool_number)
    }

    pub fn matches(&self, selector: ToolSelector) -> bool {
        match selector {
            ToolSelector::Tool(number) => self.tool_number == number,
            ToolSelector::Axis(axis) => self.axis == axis,
        }
    }

    pub fn has_toolboard(&self) -> bool {
        self.toolboard.is_some()
    }

    pub fn serialize(&self) -> SerializedToolheadConfiguration {
        SerializedToolheadConfiguration {
            tool: self.tool_number,
            axis: Some(self.axis),
            hotend: self.hotend.id.clone(),
            extruder: self.extruder.id.clone(),
            probe: self.probe.as_ref().map(|p| p.id.clone()),
            thermistor: Some(self.thermistor.clone()),
            x_endstop: self.x_endstop,
            y_endstop: self.y_endstop,
            x_accelerometer: Some(self.x_accelerometer),
            y_accelerometer: Some(self.y_accelerometer),
            toolboard: self.toolboard.as_ref().map(|b| b.id.clone()),
            part_fan: self.part_fan,
            hotend_fan: self.hotend_fan,
            nozzle: Some(self.nozzle),
        }
    }
}

/// Best-effort toolhead state; unresolved references are `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PartialToolheadConfiguration {
    pub tool_number: u8,
    pub axis: ToolAxis,
    pub hotend: Option<Hotend>,
    pub extruder: Option<Extruder>,
    pub probe: Option<Probe>,
    pub thermistor: Option<String>,
    pub x_endstop: Option<EndstopKind>,
    pub y_endstop: Option<EndstopKind>,
    pub x_accelerometer: Option<AccelerometerKind>,
    pub y_accelerometer: Option<AccelerometerKind>,
    pub toolboard: Option<Board>,
    pub part_fan: Option<FanPort>,
    pub hotend_fan: Option<FanPort>,
    pub nozzle: Option<Nozzle>,
}

impl PartialToolheadConfiguration {
    pub fn serialize(&self) -> SerializedPartialToolheadConfiguration {
        SerializedPartialToolheadConfiguration {
            tool: Some(self.tool_number),
            axis: Some(self.axis),
            hotend: self.hotend.as_ref().map(|h| h.id.clone()),
            extruder: self.extruder.as_ref().map(|e| e.id.clone()),
            probe: self.probe.as_ref().map(|p| p.id.clone()),
            thermistor: self.thermistor.clone(),
            x_endstop: self.x_endstop,
            y_endstop: self.y_endstop,
            x_accelerometer: self.x_accelerometer,
            y_accelerometer: self.y_accelerometer,
            toolboard: self.toolboard.as_ref().map(|b| b.id.clone()),
            part_fan: self.part_fan,
            hotend_fan: self.hotend_fan,
            nozzle: self.nozzle,
        }
    }
}

impl From<&ToolheadConfiguration> for PartialToolheadConfiguration {
    fn from(toolhead: &ToolheadConfiguration) -> Self {
        Self {
            tool_number: toolhead.tool_number,
            axis: toolhead.axis,
            hotend: Some(toolhead.hotend.clone()),
            extruder: Some(toolhead.extruder.clone()),
            probe: toolhead.probe.clone(),
            thermistor: Some(toolhead.thermistor.clone()),
            x_endstop: Some(toolhead.x_endstop),
            y_endstop: Some(toolhead.y_endstop),
            x_accelerometer: Some(toolhead.x_accelerometer),
            y_accelerometer: Some(toolhead.y_accelerometer),
            toolboard: toolhead.toolboard.clone(),
            part_fan: Some(toolhead.part_fan),
            hotend_fan: Some(toolhead.hotend_fan),
            nozzle: Some(toolhead.nozzle),
        }
    }
}

/// ID-only toolhead as stored and transported
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedToolheadConfiguration {
    pub tool: u8,
    /// Defaults to the carriage matching the tool number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<ToolAxis>,
    pub hotend: String,
    pub extruder: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermistor: Option<String>,
    pub x_endstop: EndstopKind,
    pub y_endstop: EndstopKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_accelerometer: Option<AccelerometerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_accelerometer: Option<AccelerometerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolboard: Option<String>,
    pub part_fan: FanPort,
    pub hotend_fan: FanPort,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nozzle: Option<Nozzle>,
}

impl From<SerializedToolheadConfiguration> for SerializedPartialToolheadConfiguration {
    fn from(toolhead: SerializedToolheadConfiguration) -> Self {
        Self {
            tool: Some(toolhead.tool),
            axis: toolhead.axis,
            hotend: Some(toolhead.hotend),
            extruder: Some(toolhead.extruder),
            probe: toolhead.probe,
            thermistor: toolhead.thermistor,
            x_endstop: Some(toolhead.x_endstop),
            y_endstop: Some(toolhead.y_endstop),
            x_accelerometer: toolhead.x_accelerometer,
            y_accelerometer: toolhead.y_accelerometer,
            toolboard: toolhead.toolboard,
            part_fan: Some(toolhead.part_fan),
            hotend_fan: Some(toolhead.hotend_fan),
            nozzle: toolhead.nozzle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SerializedPartialToolheadConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<ToolAxis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extruder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermistor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_endstop: Option<EndstopKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_endstop: Option<EndstopKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_accelerometer: Option<AccelerometerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_accelerometer: Option<AccelerometerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolboard: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_fan: Option<FanPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hotend_fan: Option<FanPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nozzle: Option<Nozzle>,
}

/// Carriage a tool number rides on when none is given
pub fn default_tool_axis(tool: u8) -> ToolAxis {
    if tool == 0 {
        ToolAxis::X
    } else {
        ToolAxis::DualCarriage
    }
}
