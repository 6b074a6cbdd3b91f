//! Metrics beacon delivery

use reqwest::header::CONTENT_TYPE;
use tokio::runtime::Handle;

/// Unacknowledged payload delivery
#[cfg_attr(test, mockall::automock)]
pub trait BeaconTransport: Send + Sync {
    /// Hand `payload` off for delivery to `endpoint`; true if it was queued
    fn send(&self, endpoint: &str, payload: &str) -> bool;
}

/// Beacon transport that POSTs JSON on a tokio runtime
///
/// The request is spawned and its outcome dropped, so callers never wait on
/// the network and never see delivery failures.
pub struct HttpBeacon {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpBeacon {
    /// Create a transport spawning onto `runtime`
    pub fn new(runtime: Handle) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pagepilot/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client, runtime }
    }

    /// Transport on the runtime of the calling context, if there is one
    pub fn from_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl BeaconTransport for HttpBeacon {
    fn send(&self, endpoint: &str, payload: &str) -> bool {
        let request = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string());
        self.runtime.spawn(async move {
            let _ = request.send().await;
        });
        true
    }
}
