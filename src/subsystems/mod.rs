//! Subsystems
//!
//! Tasks that run the estimators and publish their output.

pub mod estimation;
