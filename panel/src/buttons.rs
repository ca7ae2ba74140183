use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing::{info, warn};

use lightpanel_common::Button;

/// Host-build button source: lines `1`-`4` on stdin stand in for the
/// four hardware keys, one event per line.
pub fn spawn_stdin_source(events: mpsc::Sender<Button>) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-buttons".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                let trimmed = line.trim();
                let Some(button) = trimmed.parse::<u8>().ok().and_then(Button::from_index) else {
                    if !trimmed.is_empty() {
                        warn!("unknown button input: {trimmed:?}");
                    }
                    continue;
                };
                if events.blocking_send(button).is_err() {
                    break;
                }
            }
            info!("stdin button source closed");
        })
}
