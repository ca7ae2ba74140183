use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EntityDataError;

/// Brightness applied when the light reports none (e.g. it is off or
/// unreachable) and the user asks for a relative change anyway.
pub const DEFAULT_BRIGHTNESS: u8 = 128;

/// Brightness delta for one brighter/dimmer press.
pub const BRIGHTNESS_STEP: i16 = 25;

/// Raw entity payload as returned by `GET /api/states/{entity_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    pub state: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

impl EntityState {
    pub fn is_on(&self) -> bool {
        self.state == "on"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Unknown,
}

impl PowerState {
    fn from_state(state: &str) -> Self {
        match state {
            "on" => Self::On,
            "off" => Self::Off,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Unknown => "UNKNOWN",
        }
    }
}

pub fn mired_to_kelvin(mired: u16) -> u32 {
    (1_000_000.0 / f64::from(mired)).round() as u32
}

pub fn kelvin_to_mired(kelvin: u32) -> u16 {
    (1_000_000.0 / f64::from(kelvin)).round().clamp(1.0, f64::from(u16::MAX)) as u16
}

/// Last known reading of the light entity. Kelvin is always derived
/// from the stored mired value, never carried separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSnapshot {
    pub power: PowerState,
    pub brightness: Option<u8>,
    pub color_temp_mired: Option<u16>,
}

impl LightSnapshot {
    pub fn unknown() -> Self {
        Self {
            power: PowerState::Unknown,
            brightness: None,
            color_temp_mired: None,
        }
    }

    pub fn from_entity(entity: &EntityState) -> Self {
        let brightness = entity
            .attributes
            .get("brightness")
            .and_then(Value::as_u64)
            .map(|raw| raw.min(255) as u8);
        let color_temp_mired = entity
            .attributes
            .get("color_temp")
            .and_then(Value::as_u64)
            .filter(|mired| (1..=u64::from(u16::MAX)).contains(mired))
            .map(|mired| mired as u16);

        Self {
            power: PowerState::from_state(&entity.state),
            brightness,
            color_temp_mired,
        }
    }

    pub fn brightness_pct(&self) -> Option<u8> {
        self.brightness
            .map(|raw| (f32::from(raw) / 255.0 * 100.0).round() as u8)
    }

    pub fn kelvin(&self) -> Option<u32> {
        self.color_temp_mired.map(mired_to_kelvin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature: f32,
    pub condition: String,
}

impl WeatherSnapshot {
    pub fn try_from_entity(entity: &EntityState) -> Result<Self, EntityDataError> {
        let raw = entity
            .attributes
            .get("temperature")
            .ok_or(EntityDataError::MissingAttribute("temperature"))?;
        let temperature = raw
            .as_f64()
            .ok_or(EntityDataError::InvalidAttribute("temperature"))?;

        Ok(Self {
            temperature: temperature as f32,
            condition: entity.state.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeSnapshot {
    pub adaptive_on: bool,
}

impl ModeSnapshot {
    /// Fallback point for the adaptive switch read: an unreachable
    /// switch counts as manual mode.
    pub fn from_entity(entity: Option<&EntityState>) -> Self {
        Self {
            adaptive_on: entity.map(EntityState::is_on).unwrap_or(false),
        }
    }
}

/// The complete unit handed to the renderer. Replaced wholesale on a
/// successful refresh; a partial snapshot is never observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub light: LightSnapshot,
    pub weather: Option<WeatherSnapshot>,
    pub mode: ModeSnapshot,
    pub captured_at: DateTime<Utc>,
}

impl PanelSnapshot {
    pub fn unknown(captured_at: DateTime<Utc>) -> Self {
        Self {
            light: LightSnapshot::unknown(),
            weather: None,
            mode: ModeSnapshot { adaptive_on: false },
            captured_at,
        }
    }
}

/// Logical ids for the four panel buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    NaturalToggle,
    Brighter,
    Dimmer,
    CycleColorTemp,
}

impl Button {
    pub const ALL: [Self; 4] = [
        Self::NaturalToggle,
        Self::Brighter,
        Self::Dimmer,
        Self::CycleColorTemp,
    ];

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::NaturalToggle),
            2 => Some(Self::Brighter),
            3 => Some(Self::Dimmer),
            4 => Some(Self::CycleColorTemp),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NaturalToggle => "natural-toggle",
            Self::Brighter => "brighter",
            Self::Dimmer => "dimmer",
            Self::CycleColorTemp => "cycle-color-temp",
        }
    }
}

/// One brighter/dimmer step from the given reading, clamped so the
/// light is never driven to 0 or past 255.
pub fn step_brightness(current: Option<u8>, delta: i16) -> u8 {
    let base = i16::from(current.unwrap_or(DEFAULT_BRIGHTNESS));
    (base + delta).clamp(1, 255) as u8
}
