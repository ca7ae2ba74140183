use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lightpanel_common::{
    model::{kelvin_to_mired, step_brightness, BRIGHTNESS_STEP},
    Button, ColorTempPresets, LightSnapshot,
};

use crate::hub::RemoteStateClient;
use crate::scheduler::{RefreshHandle, RefreshReason};

/// Maps debounced button events onto hub mutations. Events are handled
/// one at a time; each mutation is awaited to completion before the
/// follow-up refresh is requested, so a press's effect is visible in
/// the very next render.
pub struct InputController<'a, C> {
    hub: &'a C,
    refresh: RefreshHandle,
    light_entity: &'a str,
    adaptive_switch: &'a str,
    presets: ColorTempPresets,
}

impl<'a, C: RemoteStateClient> InputController<'a, C> {
    pub fn new(
        hub: &'a C,
        refresh: RefreshHandle,
        light_entity: &'a str,
        adaptive_switch: &'a str,
        presets: ColorTempPresets,
    ) -> Self {
        Self {
            hub,
            refresh,
            light_entity,
            adaptive_switch,
            presets,
        }
    }

    pub async fn run(&self, mut events: mpsc::Receiver<Button>) {
        while let Some(button) = events.recv().await {
            info!(button = button.as_str(), "button pressed");
            self.handle(button).await;
        }
    }

    pub async fn handle(&self, button: Button) {
        match button {
            Button::NaturalToggle => self.toggle_natural().await,
            Button::Brighter => self.nudge_brightness(BRIGHTNESS_STEP).await,
            Button::Dimmer => self.nudge_brightness(-BRIGHTNESS_STEP).await,
            Button::CycleColorTemp => self.cycle_color_temp().await,
        }
    }

    async fn adaptive_on(&self) -> bool {
        self.hub
            .get_entity(self.adaptive_switch)
            .await
            .map(|entity| entity.is_on())
            .unwrap_or(false)
    }

    /// Reads the light from the remote rather than the cache so rapid
    /// presses compound from the freshest value.
    async fn light(&self) -> LightSnapshot {
        match self.hub.get_entity(self.light_entity).await {
            Some(entity) => LightSnapshot::from_entity(&entity),
            None => LightSnapshot::unknown(),
        }
    }

    async fn toggle_natural(&self) {
        let service = if self.adaptive_on().await {
            "turn_off"
        } else {
            "turn_on"
        };
        self.hub
            .call_service(
                "switch",
                service,
                json!({ "entity_id": self.adaptive_switch }),
            )
            .await;
        self.refresh.request(RefreshReason::Button);
    }

    async fn nudge_brightness(&self, delta: i16) {
        let light = self.light().await;
        let brightness = step_brightness(light.brightness, delta);
        self.turn_on_light(Some(brightness), None).await;
        self.refresh.request(RefreshReason::Button);
    }

    async fn cycle_color_temp(&self) {
        if !self.adaptive_on().await {
            debug!("natural mode is off, ignoring color-temp cycle");
            return;
        }

        let light = self.light().await;
        let current_k = light.kelvin().unwrap_or(self.presets.neutral_k);
        let next_k = self.presets.next_after(current_k);
        self.turn_on_light(light.brightness, Some(next_k)).await;
        self.refresh.request(RefreshReason::Button);
    }

    async fn turn_on_light(&self, brightness: Option<u8>, kelvin: Option<u32>) {
        let mut payload = json!({ "entity_id": self.light_entity });
        if let Some(brightness) = brightness {
            payload["brightness"] = json!(brightness);
        }
        if let Some(kelvin) = kelvin {
            payload["color_temp"] = json!(kelvin_to_mired(kelvin));
        }

        if !self.hub.call_service("light", "turn_on", payload).await {
            warn!("light mutation was not applied");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::{json, Value};

    use lightpanel_common::EntityState;

    use super::*;
    use crate::scheduler::refresh_channel;

    /// Hub stand-in with a live adaptive switch and a fixed light
    /// reading, recording every read and mutation.
    #[derive(Default)]
    struct RecordingHub {
        switch_on: Mutex<bool>,
        light: Mutex<Option<EntityState>>,
        calls: Mutex<Vec<(String, String, Value)>>,
        reads: Mutex<Vec<String>>,
    }

    impl RecordingHub {
        fn with_light(switch_on: bool, brightness: Option<u64>, color_temp: Option<u64>) -> Self {
            let mut attributes = serde_json::Map::new();
            if let Some(brightness) = brightness {
                attributes.insert("brightness".into(), json!(brightness));
            }
            if let Some(color_temp) = color_temp {
                attributes.insert("color_temp".into(), json!(color_temp));
            }
            let hub = Self::default();
            *hub.switch_on.lock().unwrap() = switch_on;
            *hub.light.lock().unwrap() = Some(EntityState {
                state: "on".to_string(),
                attributes,
            });
            hub
        }

        fn calls(&self) -> Vec<(String, String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl RemoteStateClient for RecordingHub {
        async fn get_entity(&self, entity_id: &str) -> Option<EntityState> {
            self.reads.lock().unwrap().push(entity_id.to_string());
            if entity_id.starts_with("switch.") {
                let state = if *self.switch_on.lock().unwrap() {
                    "on"
                } else {
                    "off"
                };
                return Some(EntityState {
                    state: state.to_string(),
                    attributes: serde_json::Map::new(),
                });
            }
            if entity_id.starts_with("light.") {
                return self.light.lock().unwrap().clone();
            }
            None
        }

        async fn call_service(&self, domain: &str, service: &str, payload: Value) -> bool {
            if domain == "switch" {
                *self.switch_on.lock().unwrap() = service == "turn_on";
            }
            self.calls
                .lock()
                .unwrap()
                .push((domain.to_string(), service.to_string(), payload));
            true
        }
    }

    const LIGHT: &str = "light.basement_lights";
    const SWITCH: &str = "switch.adaptive_basement";

    fn controller<'a>(
        hub: &'a RecordingHub,
        refresh: RefreshHandle,
    ) -> InputController<'a, RecordingHub> {
        InputController::new(hub, refresh, LIGHT, SWITCH, ColorTempPresets::default())
    }

    #[tokio::test]
    async fn natural_toggle_flips_the_switch_and_requests_refresh() {
        let hub = RecordingHub::with_light(false, Some(128), Some(370));
        let (refresh, mut requests) = refresh_channel();

        controller(&hub, refresh).handle(Button::NaturalToggle).await;

        let calls = hub.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "switch");
        assert_eq!(calls[0].1, "turn_on");
        assert_eq!(calls[0].2["entity_id"], SWITCH);
        assert!(*hub.switch_on.lock().unwrap());
        assert_eq!(requests.try_recv(), Ok(RefreshReason::Button));
    }

    #[tokio::test]
    async fn brighter_clamps_at_full_brightness() {
        let hub = RecordingHub::with_light(false, Some(250), None);
        let (refresh, mut requests) = refresh_channel();

        controller(&hub, refresh).handle(Button::Brighter).await;

        let calls = hub.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "light");
        assert_eq!(calls[0].1, "turn_on");
        assert_eq!(calls[0].2["brightness"], 255);
        assert!(calls[0].2.get("color_temp").is_none());
        assert!(requests.try_recv().is_ok());
    }

    #[tokio::test]
    async fn dimmer_steps_down_from_the_default_when_unknown() {
        let hub = RecordingHub::default();
        let (refresh, _requests) = refresh_channel();

        controller(&hub, refresh).handle(Button::Dimmer).await;

        let calls = hub.calls();
        assert_eq!(calls[0].2["brightness"], 103);
    }

    #[tokio::test]
    async fn brightness_is_read_from_the_remote_before_mutating() {
        let hub = RecordingHub::with_light(false, Some(100), None);
        let (refresh, _requests) = refresh_channel();

        controller(&hub, refresh).handle(Button::Brighter).await;

        assert_eq!(hub.reads.lock().unwrap().as_slice(), [LIGHT.to_string()]);
        assert_eq!(hub.calls()[0].2["brightness"], 125);
    }

    #[tokio::test]
    async fn cycle_is_a_no_op_while_manual() {
        let hub = RecordingHub::with_light(false, Some(128), Some(370));
        let (refresh, mut requests) = refresh_channel();

        controller(&hub, refresh)
            .handle(Button::CycleColorTemp)
            .await;

        assert!(hub.calls().is_empty());
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn cycle_advances_to_the_next_preset_preserving_brightness() {
        // 370 mired is ~2703K, nearest the warm preset; next stop is
        // neutral 4000K = 250 mired.
        let hub = RecordingHub::with_light(true, Some(128), Some(370));
        let (refresh, mut requests) = refresh_channel();

        controller(&hub, refresh)
            .handle(Button::CycleColorTemp)
            .await;

        let calls = hub.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "light");
        assert_eq!(calls[0].2["brightness"], 128);
        assert_eq!(calls[0].2["color_temp"], 250);
        assert!(requests.try_recv().is_ok());
    }
}
