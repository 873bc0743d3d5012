//! Widget contract
//!
//! A widget is a self-contained unit that owns its draw logic and is given
//! exclusive use of the panel while it is the scheduler's current widget.
//!
//! Shared bookkeeping (name, state, display time, action flags, display
//! binding) lives in [`WidgetBase`]; the [`Widget`] trait's provided methods
//! implement the lifecycle on top of it, so implementors only supply
//! [`Widget::tick`] and whichever `on_*` hooks they need.
//!
//! # Lifecycle
//!
//! ```text
//! Stopped --start()--> Running --pause()--> Paused --resume()--> Running
//!    ^                    |                    |
//!    +------stop()--------+-------stop()-------+
//! ```
//!
//! Calls made from the wrong source state are no-ops.

pub mod action;
pub mod message;

use embassy_time::Duration;
use heapless::String;
use lumen_display::DisplayBackend;

pub use action::ActionFlags;
pub use message::MessageWidget;

/// Maximum widget name length (bytes)
pub const MAX_NAME_LEN: usize = 24;

/// Bounded widget name
pub type WidgetName = String<MAX_NAME_LEN>;

/// Widget lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WidgetState {
    /// Not displayed
    Stopped,
    /// Displayed and ticking
    Running,
    /// Selected but frozen
    Paused,
}

/// Geometry of the display a widget was bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayBinding {
    /// Panel width in pixels
    pub width: u16,
    /// Panel height in pixels
    pub height: u16,
}

impl DisplayBinding {
    /// Describe `display`
    pub fn of(display: &dyn DisplayBackend) -> Self {
        Self {
            width: display.width(),
            height: display.height(),
        }
    }
}

/// Copy `name` into a bounded name, truncating at a character boundary
pub fn bounded_name(name: &str) -> WidgetName {
    let mut out = WidgetName::new();
    for ch in name.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// State shared by every widget
#[derive(Debug, Clone)]
pub struct WidgetBase {
    name: WidgetName,
    state: WidgetState,
    display_time: Duration,
    action: ActionFlags,
    display: Option<DisplayBinding>,
}

impl WidgetBase {
    /// Create a stopped widget base
    pub fn new(name: &str, display_time: Duration, action: ActionFlags) -> Self {
        Self {
            name: bounded_name(name),
            state: WidgetState::Stopped,
            display_time,
            action,
            display: None,
        }
    }
}

/// Display-producing unit managed by the scheduler
pub trait Widget {
    /// Shared widget state
    fn base(&self) -> &WidgetBase;

    /// Mutable shared widget state
    fn base_mut(&mut self) -> &mut WidgetBase;

    /// One-time preparation, called when the scheduler adopts the widget
    fn setup(&mut self, _display: &mut dyn DisplayBackend) {}

    /// Per-tick work: draw into `display.frame()` and call `display_buff()`
    ///
    /// Forwarded for the current widget whatever its state; widgets that
    /// should only animate while running check [`Widget::state`].
    fn tick(&mut self, display: &mut dyn DisplayBackend);

    /// Hook run on `Stopped -> Running`
    fn on_start(&mut self) {}

    /// Hook run on `Running | Paused -> Stopped`
    fn on_stop(&mut self) {}

    /// Hook run on `Running -> Paused`
    fn on_pause(&mut self) {}

    /// Hook run on `Paused -> Running`
    fn on_resume(&mut self) {}

    /// Begin displaying
    fn start(&mut self) {
        if self.state() == WidgetState::Stopped {
            self.base_mut().state = WidgetState::Running;
            self.on_start();
        }
    }

    /// Stop displaying
    fn stop(&mut self) {
        if self.state() != WidgetState::Stopped {
            self.base_mut().state = WidgetState::Stopped;
            self.on_stop();
        }
    }

    /// Freeze while staying selected
    fn pause(&mut self) {
        if self.state() == WidgetState::Running {
            self.base_mut().state = WidgetState::Paused;
            self.on_pause();
        }
    }

    /// Continue after a pause
    fn resume(&mut self) {
        if self.state() == WidgetState::Paused {
            self.base_mut().state = WidgetState::Running;
            self.on_resume();
        }
    }

    fn state(&self) -> WidgetState {
        self.base().state
    }

    /// How long the widget stays current before the scheduler reconsiders it
    fn display_time(&self) -> Duration {
        self.base().display_time
    }

    fn set_display_time(&mut self, display_time: Duration) {
        self.base_mut().display_time = display_time;
    }

    fn action(&self) -> ActionFlags {
        self.base().action
    }

    fn set_action(&mut self, action: ActionFlags) {
        self.base_mut().action = action;
    }

    fn add_action(&mut self, action: ActionFlags) {
        self.base_mut().action.insert(action);
    }

    fn remove_action(&mut self, action: ActionFlags) {
        self.base_mut().action.remove(action);
    }

    fn name(&self) -> &str {
        self.base().name.as_str()
    }

    fn set_name(&mut self, name: &str) {
        self.base_mut().name = bounded_name(name);
    }

    /// Record the display this widget draws into
    fn set_display(&mut self, binding: DisplayBinding) {
        self.base_mut().display = Some(binding);
    }

    /// The display this widget was bound to, if any
    fn display(&self) -> Option<DisplayBinding> {
        self.base().display
    }
}
