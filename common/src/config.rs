use serde::{Deserialize, Serialize};

use crate::color::ColorTempPresets;

/// Everything the panel needs besides the hub token, which is resolved
/// separately and kept in memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    pub hub_url: String,
    pub light_entity: String,
    pub weather_entity: String,
    pub adaptive_switch: String,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub presets: ColorTempPresets,
    pub buttons: ButtonConfig,
    /// Where host builds write the rendered frame (PBM).
    pub sim_output: String,
    /// Accepted for compatibility with older config files; glyphs are
    /// compiled in, so the file is never loaded.
    pub font_path: Option<String>,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            hub_url: "http://homeassistant.local:8123".to_string(),
            light_entity: "light.basement_lights".to_string(),
            weather_entity: "weather.forecast_home".to_string(),
            adaptive_switch: "switch.adaptive_lighting_basement_adaptive".to_string(),
            refresh_interval_secs: 15,
            request_timeout_secs: 5,
            presets: ColorTempPresets::default(),
            buttons: ButtonConfig::default(),
            sim_output: "./panel.pbm".to_string(),
            font_path: None,
        }
    }
}

impl PanelConfig {
    pub fn sanitize(&mut self) {
        while self.hub_url.ends_with('/') {
            self.hub_url.pop();
        }
        self.refresh_interval_secs = self.refresh_interval_secs.clamp(1, 3_600);
        self.request_timeout_secs = self.request_timeout_secs.clamp(1, 30);
        self.presets.sanitize();
        self.buttons.sanitize();
    }
}

/// GPIO wiring for the Waveshare 2.7" HAT keys plus the shared
/// debounce window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonConfig {
    pub natural_pin: u32,
    pub brighter_pin: u32,
    pub dimmer_pin: u32,
    pub cycle_pin: u32,
    pub debounce_ms: u64,
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            natural_pin: 5,
            brighter_pin: 6,
            dimmer_pin: 13,
            cycle_pin: 19,
            debounce_ms: 100,
        }
    }
}

impl ButtonConfig {
    pub fn sanitize(&mut self) {
        self.debounce_ms = self.debounce_ms.clamp(10, 1_000);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sanitize_clamps_intervals_and_trims_url() {
        let mut config = PanelConfig {
            hub_url: "http://hub.local:8123//".to_string(),
            refresh_interval_secs: 0,
            request_timeout_secs: 600,
            ..PanelConfig::default()
        };
        config.buttons.debounce_ms = 0;
        config.sanitize();

        assert_eq!(config.hub_url, "http://hub.local:8123");
        assert_eq!(config.refresh_interval_secs, 1);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.buttons.debounce_ms, 10);
    }

    #[test]
    fn config_files_may_omit_and_add_fields() {
        // Partial files fill in defaults; unknown keys are ignored.
        let parsed: PanelConfig = serde_json::from_str(
            r#"{"hub_url": "http://10.0.0.2:8123", "legacy_key": true}"#,
        )
        .unwrap();

        assert_eq!(parsed.hub_url, "http://10.0.0.2:8123");
        assert_eq!(parsed.refresh_interval_secs, 15);
        assert_eq!(parsed.buttons.natural_pin, 5);
        assert_eq!(parsed.font_path, None);
    }

    #[test]
    fn font_path_is_recognized_but_optional() {
        let parsed: PanelConfig =
            serde_json::from_str(r#"{"font_path": "/usr/share/fonts/x.ttf"}"#).unwrap();

        assert_eq!(parsed.font_path.as_deref(), Some("/usr/share/fonts/x.ttf"));
    }
}
