//! In-process page environment
//!
//! `Page` owns a parsed document, its stylesheets and layout, a viewport and
//! a manually driven clock. It records what the optimizer asked the platform
//! to do (smooth scrolls, beacons) so callers can inspect it.

use super::{Capabilities, Host, NavigationTiming, Viewport};
use crate::network::BeaconTransport;
use crate::renderer::{Document, HtmlParser, Layout, LayoutEngine, NodeId, Rect, StyleSheet};
use crate::utils::{PageError, Result};
use std::collections::HashMap;
use url::Url;

/// A beacon handed to the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBeacon {
    pub endpoint: String,
    pub payload: String,
}

/// Builder for [`Page`]
pub struct PageBuilder {
    url: String,
    html: String,
    viewport: Viewport,
    capabilities: Capabilities,
    stylesheets: HashMap<String, String>,
    navigation_timing: Option<NavigationTiming>,
    transport: Option<Box<dyn BeaconTransport>>,
}

impl PageBuilder {
    /// Viewport size in CSS pixels
    pub fn viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Contents for a `<link rel="stylesheet">` whose href resolves to `href`
    pub fn stylesheet(mut self, href: &str, css: &str) -> Self {
        self.stylesheets.insert(href.to_string(), css.to_string());
        self
    }

    pub fn navigation_timing(mut self, timing: NavigationTiming) -> Self {
        self.navigation_timing = Some(timing);
        self
    }

    /// Forward beacons to a real transport in addition to recording them
    pub fn transport(mut self, transport: Box<dyn BeaconTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Parse the document, attach stylesheets and compute layout
    pub fn build(self) -> Result<Page> {
        let url = Url::parse(&self.url).map_err(|e| PageError::invalid_url(&self.url, e))?;
        let mut document = HtmlParser::new().parse(&self.html, url)?;
        attach_style_sheets(&mut document, &self.stylesheets);

        let layout = LayoutEngine::new(self.viewport.width).compute(&document);
        Ok(Page {
            document,
            layout,
            viewport: self.viewport,
            clock_ms: 0.0,
            capabilities: self.capabilities,
            navigation_timing: self.navigation_timing,
            smooth_scrolls: Vec::new(),
            beacons: Vec::new(),
            transport: self.transport,
        })
    }
}

/// Build the stylesheet list from `<style>` and `<link rel=stylesheet>` elements
fn attach_style_sheets(document: &mut Document, sources: &HashMap<String, String>) {
    let origin = document.url().origin();
    let mut sheets = Vec::new();

    for id in document.elements() {
        let Some(element) = document.element(id) else {
            continue;
        };
        match element.tag_name.as_str() {
            "style" => sheets.push(StyleSheet::inline(Some(id), &document.text_content(id))),
            "link" => {
                let is_stylesheet = element
                    .get_attribute("rel")
                    .is_some_and(|rel| rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")));
                let Some(href) = element.get_attribute("href").filter(|_| is_stylesheet) else {
                    continue;
                };
                let Ok(resolved) = document.resolve_url(href) else {
                    log::warn!("Skipping stylesheet with invalid href '{}'", href);
                    continue;
                };
                let css = sources
                    .get(resolved.as_str())
                    .or_else(|| sources.get(href))
                    .map(String::as_str);
                let cors = element.has_attribute("crossorigin");
                let sheet = if resolved.origin() == origin || (cors && css.is_some()) {
                    StyleSheet::linked(Some(id), resolved, css.unwrap_or(""))
                } else {
                    StyleSheet::cross_origin(Some(id), resolved)
                };
                sheets.push(sheet);
            }
            _ => {}
        }
    }

    for sheet in sheets {
        document.add_style_sheet(sheet);
    }
}

/// In-process browser page implementing [`Host`]
pub struct Page {
    document: Document,
    layout: Layout,
    viewport: Viewport,
    clock_ms: f64,
    capabilities: Capabilities,
    navigation_timing: Option<NavigationTiming>,
    smooth_scrolls: Vec<NodeId>,
    beacons: Vec<SentBeacon>,
    transport: Option<Box<dyn BeaconTransport>>,
}

impl Page {
    /// Start building a page loaded from `url` with the given markup
    pub fn builder(url: &str, html: &str) -> PageBuilder {
        PageBuilder {
            url: url.to_string(),
            html: html.to_string(),
            viewport: Viewport::default(),
            capabilities: Capabilities::default(),
            stylesheets: HashMap::new(),
            navigation_timing: None,
            transport: None,
        }
    }

    /// Page with default viewport and capabilities
    pub fn load(url: &str, html: &str) -> Result<Self> {
        Self::builder(url, html).build()
    }

    /// Advance the clock by `ms` milliseconds
    pub fn advance(&mut self, ms: f64) {
        self.clock_ms += ms;
    }

    /// Change the viewport size, keeping the scroll position
    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.width = width;
        self.viewport.height = height;
        self.relayout();
    }

    pub fn set_capabilities(&mut self, capabilities: Capabilities) {
        self.capabilities = capabilities;
    }

    pub fn set_navigation_timing(&mut self, timing: NavigationTiming) {
        self.navigation_timing = Some(timing);
    }

    /// Recompute layout after document changes
    pub fn relayout(&mut self) {
        self.layout = LayoutEngine::new(self.viewport.width).compute(&self.document);
    }

    /// Document-space box of an element
    pub fn document_rect(&self, node: NodeId) -> Option<Rect> {
        self.layout.rect(node)
    }

    fn max_scroll(&self) -> f64 {
        (self.layout.document_height() - self.viewport.height).max(0.0)
    }

    /// Elements the platform was asked to smooth-scroll to
    pub fn smooth_scroll_requests(&self) -> &[NodeId] {
        &self.smooth_scrolls
    }

    /// Beacons handed to the page, oldest first
    pub fn beacons(&self) -> &[SentBeacon] {
        &self.beacons
    }
}

impl Host for Page {
    fn document(&self) -> &Document {
        &self.document
    }

    fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn bounding_client_rect(&self, node: NodeId) -> Option<Rect> {
        if !self.document.is_connected(node) {
            return None;
        }
        self.layout
            .rect(node)
            .map(|r| r.offset(self.viewport.scroll_x, self.viewport.scroll_y))
    }

    fn scroll_to(&mut self, y: f64) {
        self.viewport.scroll_y = y.clamp(0.0, self.max_scroll());
    }

    fn scroll_into_view_smooth(&mut self, node: NodeId) {
        self.smooth_scrolls.push(node);
        if let Some(rect) = self.layout.rect(node) {
            self.scroll_to(rect.top());
        }
    }

    fn now(&self) -> f64 {
        self.clock_ms
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.navigation_timing
    }

    fn send_beacon(&mut self, endpoint: &str, payload: &str) -> bool {
        self.beacons.push(SentBeacon {
            endpoint: endpoint.to_string(),
            payload: payload.to_string(),
        });
        if let Some(transport) = &self.transport {
            transport.send(endpoint, payload);
        }
        true
    }
}
