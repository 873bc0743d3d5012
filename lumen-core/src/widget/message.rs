//! Text message widget
//!
//! Shows up to [`MAX_LINES`] lines of ASCII text. Redraws the whole frame
//! when it starts or resumes and afterwards only flushes, so the
//! synchronizer has nothing new to send once the text is on the glass.

use embassy_time::Duration;
use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};
use heapless::{String, Vec};
use lumen_display::DisplayBackend;

use super::{ActionFlags, Widget, WidgetBase, WidgetState};

/// Maximum lines per message
pub const MAX_LINES: usize = 6;

/// Maximum characters per line (128 px / 6 px glyphs)
pub const MAX_LINE_LEN: usize = 21;

/// Vertical distance between lines
const LINE_HEIGHT: i32 = 10;

/// Multi-line text widget
pub struct MessageWidget {
    base: WidgetBase,
    lines: Vec<String<MAX_LINE_LEN>, MAX_LINES>,
    inverted: bool,
    needs_redraw: bool,
}

impl MessageWidget {
    /// Create a message; `text` is split on newlines, excess is dropped
    pub fn new(name: &str, text: &str, display_time: Duration) -> Self {
        let mut widget = Self {
            base: WidgetBase::new(name, display_time, ActionFlags::NONE),
            lines: Vec::new(),
            inverted: false,
            needs_redraw: true,
        };
        widget.set_text(text);
        widget
    }

    /// Builder: set action flags
    pub fn with_action(mut self, action: ActionFlags) -> Self {
        self.set_action(action);
        self
    }

    /// Builder: light text on dark (false) or dark on light (true)
    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Replace the text; shown on the next tick
    pub fn set_text(&mut self, text: &str) {
        self.lines.clear();
        for line in text.lines().take(MAX_LINES) {
            let mut bounded = String::new();
            for ch in line.chars() {
                if bounded.push(ch).is_err() {
                    break;
                }
            }
            let _ = self.lines.push(bounded);
        }
        self.needs_redraw = true;
    }

    /// Current lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_str())
    }

    fn draw(&self, display: &mut dyn DisplayBackend) {
        let (background, foreground) = if self.inverted {
            (BinaryColor::On, BinaryColor::Off)
        } else {
            (BinaryColor::Off, BinaryColor::On)
        };
        let style = MonoTextStyle::new(&FONT_6X10, foreground);
        let frame = display.frame();

        let _ = frame.clear(background);
        for (row, line) in self.lines.iter().enumerate() {
            let origin = Point::new(0, row as i32 * LINE_HEIGHT);
            let _ = Text::with_baseline(line.as_str(), origin, style, Baseline::Top).draw(frame);
        }
    }
}

impl Widget for MessageWidget {
    fn base(&self) -> &WidgetBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut WidgetBase {
        &mut self.base
    }

    fn on_start(&mut self) {
        self.needs_redraw = true;
    }

    fn on_resume(&mut self) {
        self.needs_redraw = true;
    }

    fn tick(&mut self, display: &mut dyn DisplayBackend) {
        if self.state() != WidgetState::Running {
            return;
        }

        if self.needs_redraw {
            self.draw(display);
            display.request_full_redraw();
            self.needs_redraw = false;
        }

        if let Err(e) = display.display_buff() {
            debug!("{=str}: flush failed: {}", self.name(), e);
        }
    }
}
