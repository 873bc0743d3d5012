//! Display backend trait
//!
//! The surface widgets draw through. Widgets borrow it for the duration of
//! a call and never own it.

use embassy_time::Instant;

use crate::buffer::FrameBuffer;
use crate::error::DisplayError;
use crate::sync::FlushStats;

/// Display backend trait
///
/// Implemented by [`crate::FrameSync`] for any I2C bus. Object safe, so
/// widgets take `&mut dyn DisplayBackend`.
pub trait DisplayBackend {
    /// Panel width in pixels
    fn width(&self) -> u16;

    /// Panel height in pixels
    fn height(&self) -> u16;

    /// Check if the display initialized successfully
    fn is_ready(&self) -> bool;

    /// The frame being drawn
    ///
    /// [`FrameBuffer`] is an `embedded_graphics` draw target.
    fn frame(&mut self) -> &mut FrameBuffer;

    /// Push changed bytes to the panel
    fn display_buff(&mut self) -> Result<FlushStats, DisplayError>;

    /// Restart incremental scanning after the next housekeeping tick
    fn request_full_redraw(&mut self);

    /// Periodic housekeeping, called once per scheduler tick
    fn housekeeping(&mut self, now: Instant) -> Result<(), DisplayError>;
}
