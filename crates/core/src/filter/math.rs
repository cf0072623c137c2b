//! Scalar filter helpers.

use core::f32::consts::{PI, TAU};
use libm::{fmodf, powf};

/// ISA sea-level pressure in Pascals
pub const SEA_LEVEL_PRESSURE_PA: f32 = 101_325.0;

/// Barometric formula exponent (R·L / g·M)
const BARO_EXPONENT: f32 = 0.190_295;

/// 44330 m scale height expressed in centimeters
const BARO_SCALE_CM: f32 = 4_433_000.0;

/// Clamp `value` to `[-limit, limit]`.
pub fn constrain_abs(value: i32, limit: i32) -> i32 {
    let limit = limit.saturating_abs();
    value.clamp(-limit, limit)
}

/// Collapse values within `[-band, band]` to exactly zero.
///
/// Values outside the band pass through unchanged.
pub fn deadband(value: i32, band: i32) -> i32 {
    if value.saturating_abs() <= band {
        0
    } else {
        value
    }
}

/// Single-pole low-pass where `retain` is the weight kept from `previous`.
///
/// `retain = 0.0` passes `sample` through, `retain = 1.0` never moves.
pub fn lowpass_retain(previous: f32, sample: f32, retain: f32) -> f32 {
    previous * retain + sample * (1.0 - retain)
}

/// Per-step smoothing factor for an RC low-pass at `cutoff_hz`.
///
/// Returns 1.0 (no smoothing) for a non-positive cutoff and 0.0 when no
/// time has passed.
pub fn smoothing_factor(cutoff_hz: f32, dt_s: f32) -> f32 {
    if dt_s <= 0.0 {
        return 0.0;
    }
    if cutoff_hz <= 0.0 {
        return 1.0;
    }
    let rc = 0.5 / (PI * cutoff_hz);
    dt_s / (rc + dt_s)
}

/// Wrap an angle in radians into `[-π, π)`.
///
/// In-range angles are returned untouched. Non-finite input maps to zero.
pub fn wrap_pi(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    if (-PI..PI).contains(&angle) {
        return angle;
    }
    let mut wrapped = fmodf(angle + PI, TAU);
    if wrapped < 0.0 {
        wrapped += TAU;
    }
    wrapped - PI
}

/// Convert pressure in Pascals to altitude in centimeters above the ISA
/// sea-level reference.
pub fn pa_to_cm(pa: u32) -> f32 {
    (1.0 - powf(pa as f32 / SEA_LEVEL_PRESSURE_PA, BARO_EXPONENT)) * BARO_SCALE_CM
}
