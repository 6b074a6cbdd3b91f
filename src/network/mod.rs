//! Network side of pagepilot
//!
//! Only one thing leaves the page: the fire-and-forget metrics beacon.

mod beacon;

pub use beacon::{BeaconTransport, HttpBeacon};

#[cfg(test)]
pub use beacon::MockBeaconTransport;
