//! Raspberry Pi backend: the Waveshare 2.7" e-paper HAT over SPI plus
//! its four keys via gpiochip edge events.

use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use linux_embedded_hal::{
    gpio_cdev::{Chip, EventRequestFlags, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, SpidevDevice,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

use lightpanel_common::{Button, ButtonConfig};

use crate::display::DisplaySink;
use crate::epd::{Epd2in7, EPD_BUFFER_LEN, EPD_HEIGHT, EPD_WIDTH};
use crate::render::{PanelFrame, HEIGHT, WIDTH};

const GPIO_CHIP: &str = "/dev/gpiochip0";
const SPI_DEVICE: &str = "/dev/spidev0.0";

// HAT wiring: BUSY 24, DC 25, RST 17; CS is CE0 on the SPI bus.
const BUSY_PIN: u32 = 24;
const DC_PIN: u32 = 25;
const RST_PIN: u32 = 17;

pub struct EpdDisplay {
    epd: Epd2in7<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>,
}

impl EpdDisplay {
    pub fn open() -> anyhow::Result<Self> {
        let mut spi = SpidevDevice::open(SPI_DEVICE).context("opening SPI device")?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(4_000_000)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options).context("configuring SPI")?;

        let mut chip = Chip::new(GPIO_CHIP).context("opening GPIO chip")?;
        let busy = request_pin(&mut chip, BUSY_PIN, LineRequestFlags::INPUT, "lightpanel-busy")?;
        let dc = request_pin(&mut chip, DC_PIN, LineRequestFlags::OUTPUT, "lightpanel-dc")?;
        let rst = request_pin(&mut chip, RST_PIN, LineRequestFlags::OUTPUT, "lightpanel-rst")?;

        info!("e-paper display opened");
        Ok(Self {
            epd: Epd2in7::new(spi, busy, dc, rst, Delay {}),
        })
    }
}

impl DisplaySink for EpdDisplay {
    fn init(&mut self) -> anyhow::Result<()> {
        self.epd.wake_up()
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.epd.clear()
    }

    fn push(&mut self, frame: &PanelFrame) -> anyhow::Result<()> {
        self.epd.display(&to_portrait(frame))
    }

    fn sleep(&mut self) -> anyhow::Result<()> {
        self.epd.sleep()
    }
}

/// Repacks the landscape frame into the panel's native portrait RAM
/// order. The renderer's set bits are lit pixels; the panel wants
/// white-high, so set bits become cleared ones.
fn to_portrait(frame: &PanelFrame) -> Vec<u8> {
    let mut portrait = vec![0xFF; EPD_BUFFER_LEN];
    let data = frame.data();
    let stride = WIDTH.div_ceil(8);

    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if data[y * stride + x / 8] & (0x80 >> (x % 8)) == 0 {
                continue;
            }
            let px = y;
            let py = EPD_HEIGHT - 1 - x;
            portrait[(py * EPD_WIDTH + px) / 8] &= !(0x80 >> (px % 8));
        }
    }
    portrait
}

fn request_pin(
    chip: &mut Chip,
    line: u32,
    flags: LineRequestFlags,
    label: &str,
) -> anyhow::Result<CdevPin> {
    let handle = chip
        .get_line(line)
        .with_context(|| format!("claiming GPIO {line}"))?
        .request(flags, 0, label)
        .with_context(|| format!("requesting GPIO {line}"))?;
    CdevPin::new(handle).with_context(|| format!("wrapping GPIO {line}"))
}

/// One reader thread per key. Events are debounced here so the rest of
/// the system sees one `Button` per qualifying press.
pub fn spawn_gpio_sources(
    config: &ButtonConfig,
    events: mpsc::Sender<Button>,
) -> anyhow::Result<Vec<thread::JoinHandle<()>>> {
    let mut chip = Chip::new(GPIO_CHIP).context("opening GPIO chip for buttons")?;
    let debounce = Duration::from_millis(config.debounce_ms);
    let pins = [
        (config.natural_pin, Button::NaturalToggle),
        (config.brighter_pin, Button::Brighter),
        (config.dimmer_pin, Button::Dimmer),
        (config.cycle_pin, Button::CycleColorTemp),
    ];

    let mut handles = Vec::with_capacity(pins.len());
    for (pin, button) in pins {
        let source = chip
            .get_line(pin)
            .with_context(|| format!("claiming GPIO {pin}"))?
            .events(
                LineRequestFlags::INPUT,
                EventRequestFlags::FALLING_EDGE,
                "lightpanel-btn",
            )
            .with_context(|| format!("subscribing to edges on GPIO {pin}"))?;

        let events = events.clone();
        let handle = thread::Builder::new()
            .name(format!("btn-{}", button.as_str()))
            .spawn(move || {
                let mut last_press: Option<Instant> = None;
                for event in source {
                    if event.is_err() {
                        continue;
                    }
                    let now = Instant::now();
                    if last_press.is_some_and(|at| now.duration_since(at) < debounce) {
                        continue;
                    }
                    last_press = Some(now);
                    if events.blocking_send(button).is_err() {
                        return;
                    }
                }
                warn!(button = button.as_str(), "gpio event stream ended");
            })
            .with_context(|| format!("spawning button thread for GPIO {pin}"))?;
        handles.push(handle);
    }

    info!("gpio button sources armed");
    Ok(handles)
}
