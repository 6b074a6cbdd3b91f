//! Link prefetching
//!
//! Same-origin links are hinted with `<link rel="prefetch">` when they come
//! within `prefetch_distance` pixels of the viewport or when the pointer
//! moves over them, whichever happens first.

use super::events::Listener;
use super::observer::IntersectionObserver;
use super::State;
use crate::host::Host;
use crate::renderer::{Document, ElementData, NodeId};
use crate::utils::Throttle;
use std::collections::HashSet;
use url::Url;

const HOVER_INTERVAL_MS: f64 = 100.0;

/// URLs already hinted during this page view
#[derive(Debug, Clone, Default)]
pub struct PrefetchedSet {
    urls: HashSet<String>,
}

impl PrefetchedSet {
    /// Record `url`; false if it was already there
    pub fn insert(&mut self, url: &str) -> bool {
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

pub(crate) struct Prefetcher {
    observer: Option<IntersectionObserver>,
    hover_throttle: Throttle,
}

impl Prefetcher {
    pub(crate) fn new() -> Self {
        Self {
            observer: None,
            hover_throttle: Throttle::new(HOVER_INTERVAL_MS),
        }
    }

    pub(crate) fn setup(&mut self, host: &mut dyn Host, state: &mut State) -> Vec<Listener> {
        if host.capabilities().intersection_observer {
            let mut observer = IntersectionObserver::new(state.config.prefetch_distance, 0.0);
            let document = host.document();
            for link in document.elements_by_tag("a") {
                if prefetchable(document, link).is_some() {
                    observer.observe(link);
                }
            }
            state.log(format!("Watching {} links for prefetch", observer.targets().len()));
            self.observer = Some(observer);
        }
        vec![Listener::PointerOver]
    }

    /// Hint links the observer reports as close to the viewport
    pub(crate) fn deliver(&mut self, host: &mut dyn Host, state: &mut State) {
        let Some(observer) = self.observer.as_mut() else {
            return;
        };
        for link in observer.take_entries(&*host) {
            observer.unobserve(link);
            if let Some(url) = prefetchable(host.document(), link) {
                prefetch_url(host.document_mut(), &url, state);
            }
        }
    }

    pub(crate) fn on_pointer_over(&mut self, host: &mut dyn Host, state: &mut State, target: NodeId) {
        if !self.hover_throttle.try_acquire(host.now()) {
            return;
        }
        let document = host.document();
        let Some(url) = document
            .closest(target, "a")
            .and_then(|link| prefetchable(document, link))
        else {
            return;
        };
        if !state.prefetched.contains(url.as_str()) {
            prefetch_url(host.document_mut(), &url, state);
        }
    }
}

/// Absolute URL of a link worth prefetching
///
/// Links without an href, pointing at another origin or at a fragment of the
/// current page are skipped.
pub(crate) fn prefetchable(document: &Document, link: NodeId) -> Option<Url> {
    let href = document.attribute(link, "href")?.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let url = document.resolve_url(href).ok()?;
    if url.origin() != document.url().origin() {
        return None;
    }
    if url.fragment().is_some() && same_document(&url, document.url()) {
        return None;
    }
    Some(url)
}

fn same_document(a: &Url, b: &Url) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.set_fragment(None);
    b.set_fragment(None);
    a == b
}

/// Append a prefetch hint for `url` unless it was hinted before
pub(crate) fn prefetch_url(document: &mut Document, url: &Url, state: &mut State) -> bool {
    let Some(head) = document.head() else {
        return false;
    };
    if !state.prefetched.insert(url.as_str()) {
        return false;
    }
    let hint = document.create_element_with(
        ElementData::new("link")
            .with_attribute("rel", "prefetch")
            .with_attribute("href", url.as_str()),
    );
    document.append_child(head, hint);

    state.metrics.resources_saved += 1;
    state.log(format!("Prefetched: {}", url));
    true
}
