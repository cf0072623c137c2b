//! State estimation: calibration, attitude and altitude
//!
//! ```text
//!  ImuSource ──► RawImuSample ──► AttitudeEstimator ──► [roll, pitch, yaw]
//!                                   │  CalibrationTracker<3> (gyro, accel)
//!                                   ▼
//!                                HardwareClock (dt)
//!
//!  PressureSource ──► AltitudeEstimator ──► altitude (cm), velocity (cm/s)
//!                       │  SlidingWindow<N>
//!                       └  CalibrationTracker<1> (ground reference)
//! ```
//!
//! Both estimators share the same lifecycle: construction starts a
//! calibration countdown and the estimator becomes `Stable` once it reaches
//! zero. Only re-initialization starts the countdown again.

pub mod altitude;
pub mod attitude;
pub mod calibration;
pub mod error;

pub use altitude::{
    AltitudeEstimator, BarometerConfig, PressureSample, DEFAULT_HISTORY_SIZE, MAX_PLAUSIBLE_PA,
    MIN_CALIBRATION_CYCLES, MIN_PLAUSIBLE_PA,
};
pub use attitude::{AttitudeConfig, AttitudeEstimator, AttitudeState, ImuCalibration, RawImuSample};
pub use calibration::{CalibrationStatus, CalibrationTracker, EstimatorPhase};
pub use error::EstimatorError;
