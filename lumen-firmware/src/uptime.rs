//! Uptime status widget
//!
//! Shows time since boot, redrawing only when the displayed second changes.

use core::fmt::Write;

use embassy_time::{Duration, Instant};
use embedded_graphics::mono_font::ascii::{FONT_10X20, FONT_6X10};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Alignment, Baseline, Text, TextStyleBuilder};
use heapless::String;
use lumen_core::{ActionFlags, Widget, WidgetBase, WidgetState};
use lumen_display::DisplayBackend;

pub struct UptimeWidget {
    base: WidgetBase,
    shown: Option<u64>,
}

impl UptimeWidget {
    pub fn new(display_time: Duration) -> Self {
        Self {
            base: WidgetBase::new("Uptime", display_time, ActionFlags::STATUS),
            shown: None,
        }
    }

    fn draw(&self, display: &mut dyn DisplayBackend, secs: u64) {
        let mut text: String<12> = String::new();
        let _ = write!(
            text,
            "{:02}:{:02}:{:02}",
            secs / 3600 % 100,
            secs / 60 % 60,
            secs % 60
        );

        let center = display.width() as i32 / 2;
        let label = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let digits = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        let centered = TextStyleBuilder::new()
            .alignment(Alignment::Center)
            .baseline(Baseline::Top)
            .build();

        let frame = display.frame();
        let _ = frame.clear(BinaryColor::Off);
        let _ = Text::with_text_style("uptime", Point::new(center, 0), label, centered).draw(frame);
        let _ = Text::with_text_style(&text, Point::new(center, 16), digits, centered).draw(frame);
    }
}

impl Widget for UptimeWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn on_start(&mut self) {
        self.shown = None;
    }

    fn tick(&mut self, display: &mut dyn DisplayBackend) {
        if self.state() != WidgetState::Running {
            return;
        }

        let secs = Instant::now().as_secs();
        if self.shown != Some(secs) {
            self.draw(display, secs);
            // Only the digits change; let the window sweep pick them up
            if self.shown.is_none() {
                display.request_full_redraw();
            }
            self.shown = Some(secs);
        }

        if let Err(e) = display.display_buff() {
            defmt::debug!("uptime flush failed: {}", e);
        }
    }
}
