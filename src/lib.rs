#![cfg_attr(not(test), no_std)]

//! kestrel - Attitude and altitude estimation for small flight controllers
//!
//! This crate wires the platform-independent estimators from `kestrel_core`
//! to a board: logging, the Embassy clock, the shared estimate snapshot and
//! the loop that drives both estimators at looptime cadence.

// Platform adapters (clock)
pub mod platform;

// Logging macros
pub mod core;

// Estimation loop and shared snapshot
pub mod subsystems;

pub use kestrel_core::{estimation, filter, parameters, traits};
