//! Core infrastructure
//!
//! Logging macros shared by every subsystem.

pub mod logging;
