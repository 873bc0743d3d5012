//! Widget action flags
//!
//! Independent scheduler-visible policy bits. Any combination is valid.

use bitflags::bitflags;

bitflags! {
    /// Set of independent widget action flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionFlags: u8 {
        /// No special handling
        const NONE = 0;
        /// Rendered out of band by a status owner
        const STATUS = 1 << 0;
        /// Destroy after one display cycle
        const AUTO_REMOVE = 1 << 1;
        /// Visibility armed by the widget itself
        const INTERNAL_ENABLED = 1 << 2;
        /// Armed and resumed by a party other than the scheduler
        const EXTERNAL_MANAGED = 1 << 3;
        /// Pending disposal
        const MARKED_FOR_REMOVE = 1 << 4;
    }
}

impl Default for ActionFlags {
    fn default() -> Self {
        Self::NONE
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ActionFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "ActionFlags({=u8:#04x})", self.bits());
    }
}
