//! Display errors

use core::fmt;

/// Display synchronizer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// A bus write to the controller failed
    Bus,
    /// Display not initialized (controller absent or init failed)
    NotInitialized,
    /// Frame buffer allocation failed
    OutOfMemory,
    /// Invalid panel dimensions
    InvalidDimensions,
    /// Invalid display settings
    InvalidSettings,
    /// Driving the reset pin failed
    ResetPin,
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::Bus => f.write_str("display bus write failed"),
            DisplayError::NotInitialized => f.write_str("display not initialized"),
            DisplayError::OutOfMemory => f.write_str("frame buffer allocation failed"),
            DisplayError::InvalidDimensions => f.write_str("invalid panel dimensions"),
            DisplayError::InvalidSettings => f.write_str("invalid display settings"),
            DisplayError::ResetPin => f.write_str("reset pin could not be driven"),
        }
    }
}
