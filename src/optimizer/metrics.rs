//! Optimization counters and the load report

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Snapshot of what the optimizer has done so far
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Milliseconds from init (or navigation start) to the load event
    pub load_time: f64,
    /// Prefetch hints issued plus scripts deferred
    pub resources_saved: u32,
    /// Images swapped in by lazy loading
    pub images_optimized: u32,
}

/// Payload sent to the analytics endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport<'a> {
    #[serde(flatten)]
    pub metrics: Metrics,
    pub url: &'a str,
    /// Wall-clock milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl<'a> MetricsReport<'a> {
    pub fn new(metrics: Metrics, url: &'a str) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            metrics,
            url,
            timestamp,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
