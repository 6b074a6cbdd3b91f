//! Developer tooling for pagepilot
//!
//! The debug console collects optimizer diagnostics when the `debug` option
//! is on.

mod console;

pub use console::{Console, ConsoleMessage, LogLevel};
