//! Display hardware settings
//!
//! Describes how the panel is wired and how the synchronizer should push
//! frames to it. Loaded from the board configuration or built in code.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::DisplayError;

/// Widest visible panel supported (pixels)
pub const MAX_WIDTH: u16 = 128;

/// Tallest panel supported (pixels)
pub const MAX_HEIGHT: u16 = 64;

/// Widest column window allowed in column-window mode
pub const MAX_WINDOW_COLUMNS: u8 = 32;

/// Default I2C address for SSD1306/SH1106 modules (0x3D with SA0 high)
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Display controller family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Controller {
    /// SSD1306: 128 column RAM, visible area starts at column 0
    #[default]
    Ssd1306,
    /// SH1106: 132 column RAM, 128 visible columns centered at column 2
    Sh1106,
}

impl Controller {
    /// First RAM column of the visible area
    pub const fn column_offset(self) -> u16 {
        match self {
            Controller::Ssd1306 => 0,
            Controller::Sh1106 => 2,
        }
    }

    /// Columns of display RAM per page
    pub const fn ram_columns(self) -> u16 {
        match self {
            Controller::Ssd1306 => 128,
            Controller::Sh1106 => 132,
        }
    }
}

/// Flush strategy as written in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FlushStrategy {
    /// Resend the whole frame whenever anything changed
    FullFrame,
    /// Inspect a fixed window of columns per flush
    #[default]
    ColumnWindow,
}

/// Resolved flush mode used by the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlushMode {
    /// Retransmit every page when any byte differs
    FullFrame,
    /// Inspect `columns` columns (across all pages) per flush
    ColumnWindow {
        /// Window width, a power of two
        columns: u8,
    },
}

/// Display wiring and behavior settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplaySettings {
    /// I2C peripheral instance (0 = I2C1)
    pub bus: u8,
    /// SDA GPIO pin
    pub sda_pin: u8,
    /// SCL GPIO pin
    pub scl_pin: u8,
    /// 7-bit I2C address
    pub address: u8,
    /// Panel width in pixels
    pub width: u16,
    /// Panel height in pixels (multiple of 8)
    pub height: u16,
    /// Reset GPIO pin, if the module exposes one
    pub reset_pin: Option<u8>,
    /// Controller family
    pub controller: Controller,
    /// Flush strategy
    pub flush_mode: FlushStrategy,
    /// Columns inspected per flush in column-window mode
    pub window_columns: u8,
    /// Panel contrast (0-255)
    pub contrast: u8,
    /// Dim the panel after this many idle milliseconds (None = never)
    pub dim_after_ms: Option<u32>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            bus: 0,
            sda_pin: 7,
            scl_pin: 6,
            address: DEFAULT_ADDRESS,
            width: 128,
            height: 64,
            reset_pin: None,
            controller: Controller::Ssd1306,
            flush_mode: FlushStrategy::ColumnWindow,
            window_columns: 4,
            contrast: 0xCF,
            dim_after_ms: None,
        }
    }
}

impl DisplaySettings {
    /// Number of 8-pixel pages
    pub const fn pages(&self) -> u16 {
        self.height.div_ceil(8)
    }

    /// Resolved flush mode
    pub const fn flush_mode(&self) -> FlushMode {
        match self.flush_mode {
            FlushStrategy::FullFrame => FlushMode::FullFrame,
            FlushStrategy::ColumnWindow => FlushMode::ColumnWindow {
                columns: self.window_columns,
            },
        }
    }

    /// Check that the settings describe a panel this driver can handle
    pub fn validate(&self) -> Result<(), DisplayError> {
        if self.width == 0 || self.width > MAX_WIDTH {
            return Err(DisplayError::InvalidDimensions);
        }
        if self.height == 0 || self.height > MAX_HEIGHT || self.height % 8 != 0 {
            return Err(DisplayError::InvalidDimensions);
        }
        if self.address > 0x7F {
            return Err(DisplayError::InvalidSettings);
        }
        if self.flush_mode == FlushStrategy::ColumnWindow {
            let k = self.window_columns;
            if k == 0 || k > MAX_WINDOW_COLUMNS || !k.is_power_of_two() {
                return Err(DisplayError::InvalidSettings);
            }
        }
        Ok(())
    }
}
