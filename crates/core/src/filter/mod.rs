//! Filter primitives shared by the estimators
//!
//! - [`math`]: clamping, deadband, low-pass and angle helpers
//! - [`window`]: fixed-size sliding window with a running sum

pub mod math;
pub mod window;

pub use math::{
    constrain_abs, deadband, lowpass_retain, pa_to_cm, smoothing_factor, wrap_pi,
    SEA_LEVEL_PRESSURE_PA,
};
pub use window::SlidingWindow;
