//! Board-agnostic widget rotation for small monochrome displays
//!
//! This crate contains everything above the panel driver:
//!
//! - Widget contract (lifecycle, display time, action flags)
//! - Single-active widget scheduler with rotation and disposal rules
//! - Time source abstraction for hardware and host runs
//! - Board configuration loading (`config` feature)
//!
//! Drawing and bus traffic go through [`lumen_display::DisplayBackend`].
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = WidgetScheduler::new(display, SystemClock);
//! scheduler.add_widget(Box::new(MessageWidget::new("hello", "Hi!", Duration::from_secs(3))))?;
//! scheduler.start();
//! loop {
//!     scheduler.tick();
//!     ticker.next().await;
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

#[cfg(feature = "config")]
pub mod config;
pub mod scheduler;
pub mod time;
pub mod widget;

// Re-export key types
#[cfg(feature = "config")]
pub use config::{ConfigError, LumenConfig, SchedulerSettings};
pub use scheduler::{Rejected, WidgetScheduler};
#[cfg(feature = "time-driver")]
pub use time::SystemClock;
pub use time::{Clock, ManualClock};
pub use widget::{ActionFlags, DisplayBinding, MessageWidget, Widget, WidgetBase, WidgetState};
