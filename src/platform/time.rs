//! Embassy-based clock implementation.

use kestrel_core::traits::HardwareClock;

/// Clock backed by the Embassy time driver.
///
/// Microseconds since boot truncated to `u32`, so readings wrap every
/// ~71.6 minutes. Interval arithmetic in the estimators is wrapping.
///
/// # Example
///
/// ```ignore
/// use kestrel::platform::EmbassyClock;
/// use kestrel_core::traits::HardwareClock;
///
/// let clock = EmbassyClock;
/// let start = clock.now_micros();
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl HardwareClock for EmbassyClock {
    fn now_micros(&self) -> u32 {
        embassy_time::Instant::now().as_micros() as u32
    }
}
