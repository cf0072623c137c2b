//! kestrel_core - Pure no_std sensor fusion for the kestrel flight controller
//!
//! This crate contains the platform-agnostic estimation algorithms that turn
//! raw inertial and barometric samples into attitude and vertical state.
//! Everything here builds and tests on the host without feature flags.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies
//! - **Trait abstractions**: Clock and sensors injected via traits
//!
//! # Modules
//!
//! - [`traits`]: Hardware boundary (HardwareClock, ImuSource, PressureSource) and mocks
//! - [`filter`]: Filter math and the sliding pressure window
//! - [`estimation`]: Calibration tracker, attitude and altitude estimators
//! - [`parameters`]: Parameter store and estimator parameter blocks

#![no_std]

pub mod estimation;
pub mod filter;
pub mod parameters;
pub mod traits;
