pub mod cache;
pub mod color;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;

pub use cache::StateCache;
pub use color::ColorTempPresets;
pub use config::{ButtonConfig, PanelConfig};
pub use error::EntityDataError;
pub use model::{
    Button, EntityState, LightSnapshot, ModeSnapshot, PanelSnapshot, PowerState, WeatherSnapshot,
};
