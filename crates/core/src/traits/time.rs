//! Microsecond clock abstraction used for gyro integration.
//!
//! This module provides the `HardwareClock` trait that abstracts over the
//! board timer, plus a `MockClock` for deterministic host tests.

use core::cell::Cell;

/// Monotonic microsecond clock.
///
/// The counter is 32 bits wide and wraps roughly every 71.6 minutes, so
/// elapsed time must always be computed with wrapping subtraction.
///
/// # Example
///
/// ```
/// use kestrel_core::traits::{HardwareClock, MockClock};
///
/// let clock = MockClock::with_initial(u32::MAX - 99);
/// let start = clock.now_micros();
/// clock.advance(250);
/// assert_eq!(clock.elapsed_since(start), 250);
/// ```
pub trait HardwareClock {
    /// Returns the current time in microseconds.
    fn now_micros(&self) -> u32;

    /// Returns microseconds elapsed since `reference_us`, across one wrap.
    fn elapsed_since(&self, reference_us: u32) -> u32 {
        self.now_micros().wrapping_sub(reference_us)
    }
}

impl<T: HardwareClock + ?Sized> HardwareClock for &T {
    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

// ============================================================================
// Mock Implementation (always available for testing)
// ============================================================================

/// Mock clock with manual time advancement.
///
/// Estimators hold a `&MockClock`, so the test can keep advancing the same
/// clock between `update()` calls.
#[derive(Clone, Default)]
pub struct MockClock {
    current_us: Cell<u32>,
}

impl MockClock {
    /// Creates a new `MockClock` starting at time 0.
    pub fn new() -> Self {
        Self {
            current_us: Cell::new(0),
        }
    }

    /// Creates a new `MockClock` starting at the specified time.
    pub fn with_initial(us: u32) -> Self {
        Self {
            current_us: Cell::new(us),
        }
    }

    /// Sets the current time to an absolute value.
    pub fn set(&self, us: u32) {
        self.current_us.set(us);
    }

    /// Advances the current time, wrapping like the hardware counter.
    pub fn advance(&self, us: u32) {
        self.current_us.set(self.current_us.get().wrapping_add(us));
    }
}

impl HardwareClock for MockClock {
    fn now_micros(&self) -> u32 {
        self.current_us.get()
    }
}
