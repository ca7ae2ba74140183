//! Text content for the fixed panel regions. Kept free of any drawing
//! so the lines can be unit tested without a framebuffer.

use chrono::{DateTime, TimeZone};

use crate::model::{LightSnapshot, WeatherSnapshot};

/// Static legend for the four hardware buttons, top to bottom.
pub const BUTTON_LEGEND: [&str; 4] = [
    "BTN1: Natural ON/OFF",
    "BTN2: Brighter",
    "BTN3: Dimmer",
    "BTN4: Cycle CT (Nat)",
];

pub fn clock_line<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    now.format("%a %b %d  %H:%M").to_string()
}

pub fn light_line(light: &LightSnapshot) -> String {
    let mut line = format!("Lights: {}", light.power.as_str());
    if let Some(pct) = light.brightness_pct() {
        line.push_str(&format!(" {pct}%"));
    }
    if let Some(kelvin) = light.kelvin() {
        line.push_str(&format!(" {kelvin}K"));
    }
    line
}

pub fn mode_line(adaptive_on: bool) -> &'static str {
    if adaptive_on {
        "MODE: NATURAL"
    } else {
        "MODE: MANUAL"
    }
}

pub fn weather_line(weather: &WeatherSnapshot) -> String {
    format!("{}\u{b0} {}", weather.temperature, weather.condition)
}
