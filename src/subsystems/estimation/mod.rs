//! Estimation subsystem
//!
//! Runs the attitude and altitude estimators from one control loop and
//! publishes a combined snapshot for other tasks.
//!
//! ```text
//!   ImuSource ──► AttitudeEstimator ──┐
//!                                     ├──► EstimateSnapshot ──► SharedEstimateState
//!   PressureSource ──► AltitudeEstimator ─┘      (every tick)        (any reader)
//!                (every baro_divider ticks)
//! ```

pub mod state;
pub mod task;

pub use state::{EstimateSnapshot, SharedEstimateState};
pub use task::EstimationLoop;

#[cfg(feature = "embassy")]
pub use task::run_estimation_task;
