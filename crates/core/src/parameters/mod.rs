//! Estimator parameters
//!
//! Named, typed configuration values kept in a fixed-capacity store, plus
//! the parameter blocks that turn them into estimator configuration. Every
//! boot loads defaults and then any overrides the board layer applies.

pub mod error;
pub mod estimator;
pub mod storage;

pub use error::ParameterError;
pub use estimator::{BaroParams, ImuParams};
pub use storage::{ParamFlags, ParamMetadata, ParamValue, ParameterStore, MAX_PARAMS, PARAM_NAME_LEN};
