//! Host environment seen by the optimizer
//!
//! Everything the features would normally reach through browser globals
//! (document, viewport, clock, capabilities, beacon delivery) goes through
//! the [`Host`] trait. [`Page`] is the in-process implementation used by the
//! CLI and the tests.

pub mod page;

pub use page::{Page, PageBuilder, SentBeacon};

use crate::renderer::{Document, NodeId, Rect};

/// Visible window geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

impl Viewport {
    /// Unscrolled viewport of the given size
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Optional platform features the optimizer checks for before use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Viewport-intersection observation is available
    pub intersection_observer: bool,
    /// Native smooth scrolling is available
    pub smooth_scroll: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            intersection_observer: true,
            smooth_scroll: true,
        }
    }
}

/// Platform navigation timing, in milliseconds on the host clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationTiming {
    pub navigation_start: f64,
    /// Zero until the load event has finished
    pub load_event_end: f64,
}

impl NavigationTiming {
    /// Load duration, once the load event has finished
    pub fn load_time(&self) -> Option<f64> {
        (self.load_event_end > 0.0).then(|| self.load_event_end - self.navigation_start)
    }
}

/// Capability handle for the page environment
pub trait Host {
    /// The live document
    fn document(&self) -> &Document;

    /// The live document, for mutation
    fn document_mut(&mut self) -> &mut Document;

    /// Current viewport geometry and scroll position
    fn viewport(&self) -> Viewport;

    /// Viewport-relative border box, `None` if the element is not rendered
    fn bounding_client_rect(&self, node: NodeId) -> Option<Rect>;

    /// Jump to a vertical scroll position
    fn scroll_to(&mut self, y: f64);

    /// Ask the platform to smooth-scroll the element into view
    fn scroll_into_view_smooth(&mut self, node: NodeId);

    /// Monotonic clock in milliseconds
    fn now(&self) -> f64;

    fn capabilities(&self) -> Capabilities;

    fn navigation_timing(&self) -> Option<NavigationTiming>;

    /// Queue a payload for unacknowledged delivery; true if it was queued
    fn send_beacon(&mut self, endpoint: &str, payload: &str) -> bool;
}
