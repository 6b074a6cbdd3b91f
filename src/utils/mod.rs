//! Shared utilities and error types

pub mod error;
pub mod throttle;

pub use error::{PageError, Result};
pub use throttle::Throttle;
