//! Deferred image loading
//!
//! Images written as `<img data-src="..." data-srcset="...">` get their real
//! sources once they come within `lazy_load_threshold` pixels of the
//! viewport. With intersection observation available the observer decides;
//! otherwise throttled scroll and resize events poll every pending image.

use super::events::Listener;
use super::observer::IntersectionObserver;
use super::State;
use crate::host::Host;
use crate::renderer::{Document, NodeId};
use crate::utils::Throttle;

pub const PENDING_SRC: &str = "data-src";
pub const PENDING_SRCSET: &str = "data-srcset";
/// Class added to images once their source is swapped in
pub const LOADED_CLASS: &str = "loaded";

const PENDING_SELECTOR: &str = "img[data-src]";
const POLL_INTERVAL_MS: f64 = 200.0;
/// Visible fraction that triggers a load
const VISIBILITY_RATIO: f64 = 0.01;

pub(crate) struct LazyLoader {
    observer: Option<IntersectionObserver>,
    scroll_throttle: Throttle,
    resize_throttle: Throttle,
}

impl LazyLoader {
    pub(crate) fn new() -> Self {
        Self {
            observer: None,
            scroll_throttle: Throttle::new(POLL_INTERVAL_MS),
            resize_throttle: Throttle::new(POLL_INTERVAL_MS),
        }
    }

    /// Start watching pending images; returns the listeners polling needs
    pub(crate) fn setup(&mut self, host: &mut dyn Host, state: &mut State) -> Vec<Listener> {
        let images = pending_images(host.document());

        if host.capabilities().intersection_observer {
            let mut observer =
                IntersectionObserver::new(state.config.lazy_load_threshold, VISIBILITY_RATIO);
            for image in &images {
                observer.observe(*image);
            }
            state.log(format!("Lazy loading {} images", images.len()));
            self.observer = Some(observer);
            Vec::new()
        } else {
            state.log("IntersectionObserver not supported, polling on scroll");
            poll(host, state);
            vec![Listener::Scroll, Listener::Resize]
        }
    }

    /// Load images the observer reports as near-visible
    pub(crate) fn deliver(&mut self, host: &mut dyn Host, state: &mut State) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };
        for image in observer.take_entries(&*host) {
            observer.unobserve(image);
            swap_in(host.document_mut(), image, state);
        }
    }

    pub(crate) fn on_scroll(&mut self, host: &mut dyn Host, state: &mut State) {
        self.scroll_throttle.call(host.now(), || poll(host, state));
    }

    pub(crate) fn on_resize(&mut self, host: &mut dyn Host, state: &mut State) {
        self.resize_throttle.call(host.now(), || poll(host, state));
    }
}

/// Check every pending image against the viewport by hand
fn poll(host: &mut dyn Host, state: &mut State) {
    let window_height = host.viewport().height;
    let threshold = state.config.lazy_load_threshold;

    for image in pending_images(host.document()) {
        let rect = host.bounding_client_rect(image).unwrap_or_default();
        if rect.top() <= window_height + threshold && rect.bottom() >= -threshold {
            swap_in(host.document_mut(), image, state);
        }
    }
}

fn pending_images(document: &Document) -> Vec<NodeId> {
    document.query_selector_all(PENDING_SELECTOR).unwrap_or_default()
}

/// Move the pending sources of `image` into place; false if it had none
pub(crate) fn swap_in(document: &mut Document, image: NodeId, state: &mut State) -> bool {
    let Some(element) = document.element_mut(image) else {
        return false;
    };
    let Some(src) = element.remove_attribute(PENDING_SRC) else {
        return false;
    };
    if let Some(srcset) = element.remove_attribute(PENDING_SRCSET) {
        element.set_attribute("srcset", srcset);
    }
    element.set_attribute("src", src.as_str());
    element.add_class(LOADED_CLASS);

    state.metrics.images_optimized += 1;
    state.log(format!("Lazy loaded image: {}", src));
    true
}
