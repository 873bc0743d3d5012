//! Widget scheduler
//!
//! Owns the widget queue and the single current widget, rotates them on
//! their display time and applies their action flags at expiry.

pub mod names;
pub mod rotation;

pub use names::SuffixGenerator;
pub use rotation::{Rejected, WidgetScheduler};
