//! Platform adapters
//!
//! Board-facing implementations of the `kestrel_core` hardware traits.

#[cfg(feature = "embassy")]
pub mod time;

#[cfg(feature = "embassy")]
pub use time::EmbassyClock;
