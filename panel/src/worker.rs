use chrono::{Local, Utc};
use tracing::{debug, warn};

use lightpanel_common::{
    LightSnapshot, ModeSnapshot, PanelSnapshot, StateCache, WeatherSnapshot,
};

use crate::display::DisplaySink;
use crate::hub::RemoteStateClient;
use crate::render;
use crate::scheduler::{Reconcile, RefreshReason};

/// Performs whole reconciliations and owns the display writer for the
/// lifetime of the refresh loop, making cache replace, render and
/// display push one serialized critical section.
pub struct PanelWorker<'a, C> {
    pub hub: &'a C,
    pub cache: &'a StateCache,
    pub display: &'a mut dyn DisplaySink,
    pub light_entity: &'a str,
    pub weather_entity: &'a str,
    pub adaptive_switch: &'a str,
}

impl<C: RemoteStateClient> PanelWorker<'_, C> {
    async fn fetch_snapshot(&self) -> PanelSnapshot {
        let light = match self.hub.get_entity(self.light_entity).await {
            Some(entity) => LightSnapshot::from_entity(&entity),
            None => LightSnapshot::unknown(),
        };

        let weather = match self.hub.get_entity(self.weather_entity).await {
            Some(entity) => match WeatherSnapshot::try_from_entity(&entity) {
                Ok(weather) => Some(weather),
                Err(err) => {
                    debug!("weather entity unusable: {err}");
                    None
                }
            },
            None => None,
        };

        let mode =
            ModeSnapshot::from_entity(self.hub.get_entity(self.adaptive_switch).await.as_ref());

        PanelSnapshot {
            light,
            weather,
            mode,
            captured_at: Utc::now(),
        }
    }
}

impl<C: RemoteStateClient> Reconcile for PanelWorker<'_, C> {
    async fn reconcile(&mut self, reason: RefreshReason) {
        debug!(?reason, "reconciling panel state");

        self.cache.replace(self.fetch_snapshot().await);

        let snapshot = self.cache.snapshot();
        let frame = render::draw_panel(&snapshot, Local::now());
        if let Err(err) = self.display.push(&frame) {
            warn!("display push failed: {err:#}");
        }
    }
}
