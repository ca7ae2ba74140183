//! Driver for the Waveshare 2.7" V2 monochrome panel. The module is an
//! SSD1680-class controller on SPI with BUSY/DC/RST sidelines; only the
//! commands this panel needs are implemented.

use anyhow::anyhow;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiDevice;

/// Native portrait geometry of the module.
pub const EPD_WIDTH: usize = 176;
pub const EPD_HEIGHT: usize = 264;
/// One full black/white frame: 1 bit per pixel, rows padded to bytes.
pub const EPD_BUFFER_LEN: usize = EPD_WIDTH / 8 * EPD_HEIGHT;

const SW_RESET: u8 = 0x12;
const DATA_ENTRY_MODE: u8 = 0x11;
const SET_RAM_Y_RANGE: u8 = 0x45;
const SET_RAM_Y_COUNTER: u8 = 0x4F;
const WRITE_RAM_BW: u8 = 0x24;
const UPDATE_CONTROL_2: u8 = 0x22;
const MASTER_ACTIVATE: u8 = 0x20;
const DEEP_SLEEP: u8 = 0x10;

// Full-refresh waveform; the panel ghosts badly on partial refreshes.
const FULL_UPDATE: u8 = 0xF7;

pub struct Epd2in7<SPI, BUSY, DC, RST, DELAY> {
    spi: SPI,
    busy: BUSY,
    dc: DC,
    rst: RST,
    delay: DELAY,
}

impl<SPI, BUSY, DC, RST, DELAY> Epd2in7<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(spi: SPI, busy: BUSY, dc: DC, rst: RST, delay: DELAY) -> Self {
        Self {
            spi,
            busy,
            dc,
            rst,
            delay,
        }
    }

    /// Hardware reset followed by the V2 init sequence. Also brings the
    /// controller back from deep sleep.
    pub fn wake_up(&mut self) -> anyhow::Result<()> {
        self.reset()?;
        self.wait_idle()?;
        self.command(SW_RESET)?;
        self.wait_idle()?;

        // RAM window covers the whole panel, Y counter rewound,
        // X/Y both incrementing.
        self.command(SET_RAM_Y_RANGE)?;
        self.data(&[0x00, 0x00, 0x07, 0x01])?;
        self.command(SET_RAM_Y_COUNTER)?;
        self.data(&[0x00, 0x00])?;
        self.command(DATA_ENTRY_MODE)?;
        self.data(&[0x03])?;
        Ok(())
    }

    /// Writes a full portrait frame and triggers a refresh. Bits are
    /// white-high: 1 = white, 0 = black.
    pub fn display(&mut self, buffer: &[u8]) -> anyhow::Result<()> {
        anyhow::ensure!(
            buffer.len() == EPD_BUFFER_LEN,
            "frame is {} bytes, panel needs {EPD_BUFFER_LEN}",
            buffer.len()
        );
        self.command(WRITE_RAM_BW)?;
        self.data(buffer)?;
        self.turn_on()
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.display(&[0xFF; EPD_BUFFER_LEN])
    }

    /// Deep sleep; only a hardware reset (`wake_up`) recovers from it.
    pub fn sleep(&mut self) -> anyhow::Result<()> {
        self.command(DEEP_SLEEP)?;
        self.data(&[0x01])?;
        self.delay.delay_ms(2);
        Ok(())
    }

    fn reset(&mut self) -> anyhow::Result<()> {
        self.rst.set_high().map_err(|err| pin_err("rst", err))?;
        self.delay.delay_ms(20);
        self.rst.set_low().map_err(|err| pin_err("rst", err))?;
        self.delay.delay_ms(2);
        self.rst.set_high().map_err(|err| pin_err("rst", err))?;
        self.delay.delay_ms(20);
        Ok(())
    }

    fn turn_on(&mut self) -> anyhow::Result<()> {
        self.command(UPDATE_CONTROL_2)?;
        self.data(&[FULL_UPDATE])?;
        self.command(MASTER_ACTIVATE)?;
        self.wait_idle()
    }

    fn command(&mut self, command: u8) -> anyhow::Result<()> {
        self.dc.set_low().map_err(|err| pin_err("dc", err))?;
        self.spi
            .write(&[command])
            .map_err(|err| anyhow!("spi command {command:#04x} failed: {err:?}"))
    }

    fn data(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.dc.set_high().map_err(|err| pin_err("dc", err))?;
        self.spi
            .write(data)
            .map_err(|err| anyhow!("spi data write failed: {err:?}"))
    }

    /// BUSY is active high. A full refresh on this panel takes a couple
    /// of seconds; anything past the cap means a wedged controller.
    fn wait_idle(&mut self) -> anyhow::Result<()> {
        for _ in 0..3_000 {
            let busy = self
                .busy
                .is_high()
                .map_err(|err| pin_err("busy", err))?;
            if !busy {
                return Ok(());
            }
            self.delay.delay_ms(10);
        }
        Err(anyhow!("panel stuck busy"))
    }
}

fn pin_err(pin: &'static str, err: impl core::fmt::Debug) -> anyhow::Error {
    anyhow!("{pin} pin failed: {err:?}")
}
