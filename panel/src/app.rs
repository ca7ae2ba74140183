use std::io::Write as _;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use lightpanel_common::{Button, PanelConfig, PanelSnapshot, StateCache};

use crate::display::DisplaySink;
use crate::hub::{HubClient, RemoteStateClient};
use crate::input::InputController;
use crate::scheduler::{self, refresh_channel};
use crate::worker::PanelWorker;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    let token = resolve_token()?;

    let hub = HubClient::new(
        &config.hub_url,
        &token,
        Duration::from_secs(config.request_timeout_secs),
    )?;

    // Device faults here are fatal; the loop never starts on broken
    // hardware.
    let mut display = open_display(&config)?;
    display.init().context("initializing display")?;
    display.clear().context("clearing display")?;

    let (buttons_tx, buttons_rx) = mpsc::channel(16);
    spawn_button_source(&config, buttons_tx)?;

    let (refresh, mut refresh_rx) = refresh_channel();
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    let cache = StateCache::new(PanelSnapshot::unknown(chrono::Utc::now()));
    let input = InputController::new(
        &hub,
        refresh.clone(),
        &config.light_entity,
        &config.adaptive_switch,
        config.presets,
    );
    let mut worker = PanelWorker {
        hub: &hub,
        cache: &cache,
        display: display.as_mut(),
        light_entity: &config.light_entity,
        weather_entity: &config.weather_entity,
        adaptive_switch: &config.adaptive_switch,
    };

    info!(hub = %config.hub_url, light = %config.light_entity, "panel started");
    drive(
        &mut worker,
        &input,
        buttons_rx,
        &mut refresh_rx,
        Duration::from_secs(config.refresh_interval_secs),
        &mut shutdown_rx,
    )
    .await;

    display.sleep().context("putting display to sleep")?;
    info!("display asleep, exiting");
    Ok(())
}

/// Runs the refresh loop and the input controller side by side. A
/// closed button stream is not a reason to stop: the panel keeps
/// refreshing on the timer, and only the scheduler arm (shutdown or a
/// dropped refresh handle) ends the run.
async fn drive<C: RemoteStateClient>(
    worker: &mut PanelWorker<'_, C>,
    input: &InputController<'_, C>,
    buttons: mpsc::Receiver<Button>,
    requests: &mut mpsc::Receiver<scheduler::RefreshReason>,
    interval: Duration,
    shutdown: &mut watch::Receiver<bool>,
) {
    let input_loop = async {
        input.run(buttons).await;
        info!("button source closed, continuing without input");
        std::future::pending::<()>().await
    };

    tokio::select! {
        _ = scheduler::run_refresh_loop(worker, requests, interval, shutdown) => {}
        _ = input_loop => {}
    }
}

fn load_config() -> anyhow::Result<PanelConfig> {
    let path =
        std::env::var("LIGHTPANEL_CONFIG").unwrap_or_else(|_| "./lightpanel.json".to_string());

    let mut config: PanelConfig = match std::fs::read(&path) {
        Ok(raw) => serde_json::from_slice(&raw).with_context(|| format!("parsing config {path}"))?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => PanelConfig::default(),
        Err(err) => return Err(err).with_context(|| format!("reading config {path}")),
    };

    if let Ok(url) = std::env::var("HA_URL") {
        config.hub_url = url;
    }

    config.sanitize();
    if let Some(font_path) = &config.font_path {
        debug!("font_path {font_path:?} is unused, panel fonts are compiled in");
    }
    Ok(config)
}

/// The hub token lives in the environment or is prompted for; it is
/// never written to disk.
fn resolve_token() -> anyhow::Result<String> {
    if let Ok(token) = std::env::var("HA_TOKEN") {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    print!("Home Assistant token: ");
    std::io::stdout().flush().context("flushing token prompt")?;
    let mut token = String::new();
    std::io::stdin()
        .read_line(&mut token)
        .context("reading token")?;
    let token = token.trim().to_string();
    anyhow::ensure!(!token.is_empty(), "a hub token is required");
    Ok(token)
}

#[cfg(not(feature = "rpi"))]
fn open_display(config: &PanelConfig) -> anyhow::Result<Box<dyn DisplaySink>> {
    Ok(Box::new(crate::display::SimDisplay::new(&config.sim_output)))
}

#[cfg(feature = "rpi")]
fn open_display(_config: &PanelConfig) -> anyhow::Result<Box<dyn DisplaySink>> {
    Ok(Box::new(crate::hw::EpdDisplay::open()?))
}

#[cfg(not(feature = "rpi"))]
fn spawn_button_source(_config: &PanelConfig, events: mpsc::Sender<Button>) -> anyhow::Result<()> {
    crate::buttons::spawn_stdin_source(events).context("spawning stdin button source")?;
    Ok(())
}

#[cfg(feature = "rpi")]
fn spawn_button_source(config: &PanelConfig, events: mpsc::Sender<Button>) -> anyhow::Result<()> {
    crate::hw::spawn_gpio_sources(&config.buttons, events)?;
    Ok(())
}
