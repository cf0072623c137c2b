//! Estimator configuration errors
//!
//! Raised only at construction time. Once an estimator exists, nothing in
//! the update path returns an error: glitches are absorbed by the filters.

use super::altitude::MIN_CALIBRATION_CYCLES;

/// Rejected estimator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorError {
    /// Accelerometer 1g reference is zero
    InvalidAccel1g,
    /// Gyro scale is zero, negative or not finite
    InvalidGyroScale,
    /// Accelerometer low-pass cutoff is negative or not finite
    InvalidLowpassCutoff,
    /// Looptime or maximum integration step is zero
    InvalidLooptime,
    /// Complementary filter factor is not a positive finite number
    InvalidComplementaryFactor,
    /// Barometer noise low-pass weight outside [0, 1]
    InvalidNoiseLpf,
    /// Velocity bound is not positive
    InvalidVelocityBound,
    /// Velocity deadband is negative
    InvalidVelocityDeadband,
    /// Ground calibration too short for the reference to settle
    InvalidCalibrationCycles,
    /// Accepted pressure range is empty, non-positive or overflows the window sum
    InvalidPressureRange,
}

impl EstimatorError {
    /// Return variant name as a static string (usable with defmt on embedded)
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimatorError::InvalidAccel1g => "InvalidAccel1g",
            EstimatorError::InvalidGyroScale => "InvalidGyroScale",
            EstimatorError::InvalidLowpassCutoff => "InvalidLowpassCutoff",
            EstimatorError::InvalidLooptime => "InvalidLooptime",
            EstimatorError::InvalidComplementaryFactor => "InvalidComplementaryFactor",
            EstimatorError::InvalidNoiseLpf => "InvalidNoiseLpf",
            EstimatorError::InvalidVelocityBound => "InvalidVelocityBound",
            EstimatorError::InvalidVelocityDeadband => "InvalidVelocityDeadband",
            EstimatorError::InvalidCalibrationCycles => "InvalidCalibrationCycles",
            EstimatorError::InvalidPressureRange => "InvalidPressureRange",
        }
    }
}

impl core::fmt::Display for EstimatorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EstimatorError::InvalidAccel1g => write!(f, "accelerometer 1g reference must be non-zero"),
            EstimatorError::InvalidGyroScale => write!(f, "gyro scale must be positive and finite"),
            EstimatorError::InvalidLowpassCutoff => {
                write!(f, "accelerometer low-pass cutoff must be finite and >= 0")
            }
            EstimatorError::InvalidLooptime => write!(f, "looptime must be non-zero"),
            EstimatorError::InvalidComplementaryFactor => {
                write!(f, "complementary filter factor must be positive and finite")
            }
            EstimatorError::InvalidNoiseLpf => write!(f, "barometer noise lpf must be in [0, 1]"),
            EstimatorError::InvalidVelocityBound => write!(f, "velocity bound must be positive"),
            EstimatorError::InvalidVelocityDeadband => {
                write!(f, "velocity deadband must not be negative")
            }
            EstimatorError::InvalidCalibrationCycles => {
                write!(
                    f,
                    "ground calibration cycles must be 0 or at least {}",
                    MIN_CALIBRATION_CYCLES
                )
            }
            EstimatorError::InvalidPressureRange => {
                write!(f, "pressure range must satisfy 0 < min <= max and fit the window sum")
            }
        }
    }
}
