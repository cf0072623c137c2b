//! Hardware boundary traits for the estimation core.
//!
//! The estimators never touch registers or buses. Everything they need from
//! the board is injected through these traits at construction time, so any
//! number of independent estimator instances can run side by side (flight,
//! replay, simulation).
//!
//! # Design
//!
//! - Trait definitions are pure and have no feature gates
//! - Mock implementations are always available for host testing
//! - Platform implementations (Embassy) live in the `kestrel` crate

pub mod sensors;
pub mod time;

pub use sensors::{ImuSource, MockImu, MockPressure, PressureSource, PRESSURE_SCRIPT_LEN};
pub use time::{HardwareClock, MockClock};
