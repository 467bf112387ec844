//! Selectable hardware options computed by the option resolver

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndstopKind {
    Endstop,
    EndstopToolboard,
    Sensorless,
}

impl EndstopKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndstopKind::Endstop => "endstop",
            EndstopKind::EndstopToolboard => "endstop-toolboard",
            EndstopKind::Sensorless => "sensorless",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            EndstopKind::Endstop => "Physical Endstop",
            EndstopKind::EndstopToolboard => "Physical Endstop (toolboard)",
            EndstopKind::Sensorless => "Sensorless Homing",
        }
    }
}

impl fmt::Display for EndstopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fan header a fan is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FanPort {
    #[serde(rename = "2pin")]
    TwoPin,
    #[serde(rename = "4pin")]
    FourPin,
    #[serde(rename = "2pin-toolboard")]
    TwoPinToolboard,
    #[serde(rename = "4pin-toolboard")]
    FourPinToolboard,
}

impl FanPort {
    pub fn as_str(&self) -> &'static str {
        match self {
            FanPort::TwoPin => "2pin",
            FanPort::FourPin => "4pin",
            FanPort::TwoPinToolboard => "2pin-toolboard",
            FanPort::FourPinToolboard => "4pin-toolboard",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FanPort::TwoPin => "2-pin fan header",
            FanPort::FourPin => "4-pin fan header",
            FanPort::TwoPinToolboard => "2-pin fan header (toolboard)",
            FanPort::FourPinToolboard => "4-pin fan header (toolboard)",
        }
    }

    pub fn on_toolboard(&self) -> bool {
        matches!(self, FanPort::TwoPinToolboard | FanPort::FourPinToolboard)
    }

    pub fn is_four_pin(&self) -> bool {
        matches!(self, FanPort::FourPin | FanPort::FourPinToolboard)
    }
}

impl fmt::Display for FanPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an axis' accelerometer is connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccelerometerKind {
    Controlboard,
    Toolboard,
    Rpi,
}

impl AccelerometerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccelerometerKind::Controlboard => "controlboard",
            AccelerometerKind::Toolboard => "toolboard",
            AccelerometerKind::Rpi => "rpi",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AccelerometerKind::Controlboard => "Controlboard",
            AccelerometerKind::Toolboard => "Toolboard",
            AccelerometerKind::Rpi => "Raspberry Pi",
        }
    }
}

impl fmt::Display for AccelerometerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of one option query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "options", rename_all = "snake_case")]
pub enum ResolvedOptions {
    Endstops(Vec<EndstopKind>),
    Fans(Vec<FanPort>),
    Accelerometers(Vec<AccelerometerKind>),
}

impl ResolvedOptions {
    pub fn len(&self) -> usize {
        match self {
            ResolvedOptions::Endstops(options) => options.len(),
            ResolvedOptions::Fans(options) => options.len(),
            ResolvedOptions::Accelerometers(options) => options.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(id, title)` pairs in resolver order
    pub fn entries(&self) -> Vec<(&'static str, &'static str)> {
        match self {
            ResolvedOptions::Endstops(options) => {
                options.iter().map(|o| (o.as_str(), o.title())).collect()
            }
            ResolvedOptions::Fans(options) => {
                options.iter().map(|o| (o.as_str(), o.title())).collect()
            }
            ResolvedOptions::Accelerometers(options) => {
                options.iter().map(|o| (o.as_str(), o.title())).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_port_ids() {
        let json = serde_json::to_string(&FanPort::FourPinToolboard).unwrap();
        assert_eq!(json, "\"4pin-toolboard\"");
        let port: FanPort = serde_json::from_str("\"2pin\"").unwrap();
        assert_eq!(port, FanPort::TwoPin);
        assert!(FanPort::TwoPinToolboard.on_toolboard());
    }

    #[test]
    fn test_resolved_options_entries() {
        let options =
            ResolvedOptions::Endstops(vec![EndstopKind::Endstop, EndstopKind::Sensorless]);
        assert_eq!(options.len(), 2);
        assert_eq!(
            options.entries(),
            vec![
                ("endstop", "Physical Endstop"),
                ("sensorless", "Sensorless Homing")
            ]
        );
    }
}
