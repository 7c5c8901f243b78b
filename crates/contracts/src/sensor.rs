//! SensorUpdate - typed view of a hub event item
//!
//! Items are decoded into a plain record keyed by their `type` field, then
//! matched as an enum. Unknown resource types fall into `Other`.

use serde::Deserialize;

use crate::ParseError;

/// Decoded hub event item
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SensorUpdate {
    /// Presence sensor change
    Motion {
        id: String,
        #[serde(default)]
        id_v1: Option<String>,
        motion: MotionReport,
    },

    /// Ambient light sensor change
    LightLevel {
        id: String,
        #[serde(default)]
        id_v1: Option<String>,
        light: LightLevelReport,
    },

    /// Temperature sensor change
    Temperature {
        id: String,
        #[serde(default)]
        id_v1: Option<String>,
        temperature: TemperatureReport,
    },

    /// Light on/off or brightness change
    Light {
        id: String,
        #[serde(default)]
        id_v1: Option<String>,
        #[serde(default)]
        on: Option<OnState>,
        #[serde(default)]
        dimming: Option<Dimming>,
    },

    /// Any resource type the bridge does not model
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MotionReport {
    pub motion: bool,
    #[serde(default = "valid")]
    pub motion_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LightLevelReport {
    /// Hub-encoded level: `10000 * log10(lux) + 1`
    pub light_level: u32,
    #[serde(default = "valid")]
    pub light_level_valid: bool,
}

impl LightLevelReport {
    /// Convert the hub's logarithmic level to lux
    pub fn lux(&self) -> f64 {
        10f64.powf((f64::from(self.light_level) - 1.0) / 10000.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TemperatureReport {
    /// Degrees Celsius
    pub temperature: f64,
    #[serde(default = "valid")]
    pub temperature_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OnState {
    pub on: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Dimming {
    pub brightness: f64,
}

fn valid() -> bool {
    true
}

impl SensorUpdate {
    /// Decode from an item's JSON text
    pub fn from_json(json: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode from an already-parsed value
    pub fn from_value(value: serde_json::Value) -> Result<Self, ParseError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Resource id, if the variant carries one
    pub fn resource_id(&self) -> Option<&str> {
        match self {
            Self::Motion { id, .. }
            | Self::LightLevel { id, .. }
            | Self::Temperature { id, .. }
            | Self::Light { id, .. } => Some(id),
            Self::Other => None,
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Motion { .. } => "motion",
            Self::LightLevel { .. } => "light_level",
            Self::Temperature { .. } => "temperature",
            Self::Light { .. } => "light",
            Self::Other => "other",
        }
    }
}
