use serde::{Deserialize, Serialize};

use super::motion::{BuildSize, Kinematics, PrinterAxis};
use super::options::FanPort;
use super::rail::SerializedRail;
use super::toolhead::SerializedToolheadConfiguration;

/// Suffix of printer template identifiers
pub const TEMPLATE_SUFFIX: &str = "-printer.template.cfg";

/// Default hardware shipped with a printer model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDefaults {
    pub controlboard: String,
    pub toolheads: Vec<SerializedToolheadConfiguration>,
    pub rails: Vec<SerializedRail>,
    #[serde(default = "default_controller_fan")]
    pub controller_fan: FanPort,
}

fn default_controller_fan() -> FanPort {
    FanPort::TwoPin
}

/// A supported printer model (`printers/<id>/printer-definition.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDefinition {
    /// Directory name of the definition, assigned on load
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub description: String,
    pub manufacturer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub kinematics: Kinematics,
    /// Cubic build sizes in millimeters, first one is the default
    pub sizes: Vec<u32>,
    pub template: String,
    pub defaults: PrinterDefaults,
}

impl PrinterDefinition {
    /// Axes a configuration of this printer must carry exactly one rail for
    pub fn required_axes(&self) -> Vec<PrinterAxis> {
        let mut axes: Vec<PrinterAxis> = self.defaults.rails.iter().map(|r| r.axis).collect();
        axes.sort();
        axes.dedup();
        axes
    }

    pub fn default_size(&self) -> Option<BuildSize> {
        self.sizes.first().copied().map(BuildSize::cube)
    }

    pub fn supports_size(&self, size: u32) -> bool {
        self.sizes.contains(&size)
    }

    /// Template family name, e.g. `caramba-idex` for `caramba-idex-printer.template.cfg`
    pub fn template_family(&self) -> &str {
        self.template
            .strip_suffix(TEMPLATE_SUFFIX)
            .unwrap_or(&self.template)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_family() {
        let json = r#"{
            "name": "V-Core 4",
            "description": "CoreXY",
            "manufacturer": "Rat Rig",
            "kinematics": "corexy",
            "sizes": [300, 400],
            "template": "v-core-printer.template.cfg",
            "defaults": { "controlboard": "octopus", "toolheads": [], "rails": [] }
        }"#;
        let printer: PrinterDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(printer.template_family(), "v-core");
        assert_eq!(printer.default_size(), Some(BuildSize::cube(300)));
        assert_eq!(printer.defaults.controller_fan, FanPort::TwoPin);
        assert!(printer.required_axes().is_empty());
    }
}
