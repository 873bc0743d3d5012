//! Differential frame-buffer synchronizer for monochrome OLED panels
//!
//! This crate provides:
//! - `FrameBuffer`: the drawn and last-transmitted page buffers, usable as an
//!   `embedded_graphics` draw target
//! - `FrameSync`: pushes only changed bytes to an SSD1306/SH1106 over I2C,
//!   either as whole frames or as a bounded column window per call
//! - `DisplayBackend`: the object-safe surface widgets draw through
//! - `DisplaySettings`: panel wiring and flush configuration
//!
//! # Architecture
//!
//! ```text
//! widget draws ──▶ FrameBuffer.current
//!                        │ display_buff()
//!                        ▼
//!             diff against last_sent ──▶ page/column address + data ──▶ I2C
//! ```
//!
//! Bus transfers are blocking. Column-window mode exists to cap how long a
//! single flush can hold the cooperative loop.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod backend;
pub mod buffer;
pub mod command;
pub mod error;
pub mod settings;
pub mod sync;

// Re-export key types
pub use backend::DisplayBackend;
pub use buffer::FrameBuffer;
pub use error::DisplayError;
pub use settings::{Controller, DisplaySettings, FlushMode, FlushStrategy};
pub use sync::{FlushStats, FrameSync, WindowCursor};
