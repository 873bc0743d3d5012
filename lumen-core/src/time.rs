//! Time source
//!
//! The scheduler reads time through [`Clock`] so it can run against the
//! embassy time driver on hardware and a hand-cranked clock on the host.

use core::cell::Cell;

use embassy_time::{Duration, Instant};

/// Monotonic time source
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by the embassy time driver
#[cfg(feature = "time-driver")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[cfg(feature = "time-driver")]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
///
/// Useful for simulators and tests; share it with the scheduler by
/// reference.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<u64>,
}

impl ManualClock {
    /// Clock starting at `ms` milliseconds
    pub fn starting_at(ms: u64) -> Self {
        Self {
            now_ms: Cell::new(ms),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now_ms.set(self.now_ms.get() + by.as_millis());
    }

    /// Jump to an absolute time
    pub fn set_millis(&self, ms: u64) {
        self.now_ms.set(ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms.get())
    }
}
