use chrono::{DateTime, Local};
use embedded_graphics::{
    framebuffer::{buffer_size, Framebuffer},
    mono_font::{
        iso_8859_1::{FONT_10X20, FONT_6X10, FONT_7X13},
        MonoTextStyle,
    },
    pixelcolor::{
        raw::{BigEndian, RawU1},
        BinaryColor,
    },
    prelude::*,
    text::{Baseline, Text},
};

use lightpanel_common::{layout, PanelSnapshot};

/// Landscape geometry of the 2.7" panel (the module is 176x264
/// portrait; we draw rotated).
pub const WIDTH: usize = 264;
pub const HEIGHT: usize = 176;

/// One rendered frame, 1 bit per pixel, rows padded to whole bytes,
/// most significant bit first.
pub type PanelFrame = Framebuffer<
    BinaryColor,
    RawU1,
    BigEndian,
    WIDTH,
    HEIGHT,
    { buffer_size::<BinaryColor>(WIDTH, HEIGHT) },
>;

/// Composes the panel from a snapshot and the current clock. Pure: the
/// same snapshot and time always produce the same frame. Fixed
/// regions: clock header, light line, mode line, weather block (only
/// when present), button legend.
pub fn draw_panel(snapshot: &PanelSnapshot, now: DateTime<Local>) -> PanelFrame {
    let mut frame = PanelFrame::new();

    let large = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
    let medium = MonoTextStyle::new(&FONT_7X13, BinaryColor::On);
    let small = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

    let mut put = |text: &str, y: i32, style: MonoTextStyle<'static, BinaryColor>| {
        Text::with_baseline(text, Point::new(4, y), style, Baseline::Top)
            .draw(&mut frame)
            .ok();
    };

    put(&layout::clock_line(&now), 2, large);
    put(&layout::light_line(&snapshot.light), 26, medium);
    put(layout::mode_line(snapshot.mode.adaptive_on), 44, medium);

    if let Some(weather) = &snapshot.weather {
        put("Weather:", 64, medium);
        put(&layout::weather_line(weather), 80, medium);
    }

    for (index, label) in layout::BUTTON_LEGEND.iter().enumerate() {
        put(label, 102 + index as i32 * 16, small);
    }

    drop(put);
    frame
}
