//! Page performance optimizer
//!
//! [`Optimizer`] owns the configuration, the metrics and the per-feature
//! state, and drives every feature against an injected [`Host`]. Features are
//! switched on once by [`Optimizer::init`]; after that the optimizer reacts
//! to the events it registered for through [`Optimizer::dispatch`].

mod config;
mod critical_css;
mod events;
mod fonts;
mod lazy_load;
mod metrics;
mod observer;
mod prefetch;
mod resource_hints;
mod script_defer;
mod smooth_scroll;

pub use config::{Config, ConfigPatch};
pub use critical_css::CRITICAL_STYLE_ID;
pub use events::{DispatchOutcome, Listener, PageEvent};
pub use fonts::{first_font_url, PRELOAD_LIMIT};
pub use lazy_load::{LOADED_CLASS, PENDING_SRC, PENDING_SRCSET};
pub use metrics::{Metrics, MetricsReport};
pub use observer::IntersectionObserver;
pub use prefetch::PrefetchedSet;
pub use resource_hints::{ExternalHost, PRECONNECT_LIMIT};
pub use script_defer::{should_defer, CRITICAL_MARKER};
pub use smooth_scroll::{ease_in_out_cubic, SCROLL_DURATION_MS};

use crate::devtools::{Console, ConsoleMessage};
use crate::host::Host;
use lazy_load::LazyLoader;
use prefetch::Prefetcher;
use smooth_scroll::SmoothScroller;

/// State every feature reads or updates
pub(crate) struct State {
    pub(crate) config: Config,
    pub(crate) metrics: Metrics,
    pub(crate) prefetched: PrefetchedSet,
    pub(crate) console: Console,
}

impl State {
    pub(crate) fn new(config: Config) -> Self {
        let console = Console::new(config.debug);
        Self {
            config,
            metrics: Metrics::default(),
            prefetched: PrefetchedSet::default(),
            console,
        }
    }

    /// Record a diagnostic when debug output is on
    pub(crate) fn log(&self, message: impl Into<String>) {
        self.console.debug(message);
    }

    pub(crate) fn info(&self, message: impl Into<String>) {
        self.console.info(message);
    }

    /// Recoverable failures; the operation carries on without the item
    pub(crate) fn warn(&self, message: impl Into<String>) {
        self.console.warn(message);
    }

    fn merge_config(&mut self, patch: &ConfigPatch) {
        self.config.merge(patch);
        self.console.set_enabled(self.config.debug);
    }
}

/// Client-side page performance optimizer
pub struct Optimizer<H: Host> {
    host: H,
    state: State,
    initialized: bool,
    start_time: f64,
    listeners: Vec<Listener>,
    lazy_loader: LazyLoader,
    prefetcher: Prefetcher,
    scroller: SmoothScroller,
}

impl<H: Host> Optimizer<H> {
    /// Optimizer with default options overridden by `options`
    ///
    /// Nothing runs until [`init`](Self::init) is called.
    pub fn new(host: H, options: ConfigPatch) -> Self {
        Self::with_config(host, Config::with_patch(&options))
    }

    /// Optimizer with a complete configuration
    pub fn with_config(host: H, config: Config) -> Self {
        let start_time = host.now();
        Self {
            host,
            state: State::new(config),
            initialized: false,
            start_time,
            listeners: Vec::new(),
            lazy_loader: LazyLoader::new(),
            prefetcher: Prefetcher::new(),
            scroller: SmoothScroller::new(),
        }
    }

    /// Set up every enabled feature; later calls only log
    pub fn init(&mut self, options: Option<ConfigPatch>) -> &mut Self {
        if self.initialized {
            self.state.log("Already initialized");
            return self;
        }
        if let Some(options) = options {
            self.state.merge_config(&options);
        }
        self.initialized = true;
        self.start_time = self.host.now();
        self.state.log("Initializing...");

        let config = self.state.config.clone();
        if config.lazy_load {
            let listeners = self.lazy_loader.setup(&mut self.host, &mut self.state);
            self.register(listeners);
        }
        if config.prefetch {
            let listeners = self.prefetcher.setup(&mut self.host, &mut self.state);
            self.register(listeners);
        }
        if config.smooth_scroll {
            self.register([Listener::Click]);
        }
        if config.font_optimization {
            fonts::optimize_fonts(&mut self.host, &mut self.state);
        }
        if config.resource_hints {
            resource_hints::add_resource_hints(&mut self.host, &mut self.state);
        }
        if config.defer_js {
            script_defer::defer_scripts(&mut self.host, &mut self.state);
        }
        self.register([Listener::Load]);

        self.run_observers();
        self
    }

    fn register(&mut self, listeners: impl IntoIterator<Item = Listener>) {
        self.listeners.extend(listeners);
    }

    fn is_listening(&self, listener: Listener) -> bool {
        self.listeners.contains(&listener)
    }

    /// Merge options without re-running feature setup
    pub fn update_config(&mut self, options: ConfigPatch) -> &mut Self {
        self.state.merge_config(&options);
        self.state.log("Config updated");
        self
    }

    /// Hint `url` for prefetching unless it was hinted before
    pub fn prefetch(&mut self, url: &str) -> &mut Self {
        match self.host.document().resolve_url(url) {
            Ok(resolved) => {
                prefetch::prefetch_url(self.host.document_mut(), &resolved, &mut self.state);
            }
            Err(e) => self.state.warn(format!("Cannot prefetch: {}", e)),
        }
        self
    }

    /// Swap in the pending source of the image matching `selector`
    pub fn load_image(&mut self, selector: &str) -> &mut Self {
        match self.host.document().query_selector(selector) {
            Ok(Some(image)) => {
                lazy_load::swap_in(self.host.document_mut(), image, &mut self.state);
            }
            Ok(None) => {}
            Err(e) => self.state.warn(format!("Cannot load image: {}", e)),
        }
        self
    }

    /// CSS needed to render the current viewport
    pub fn generate_critical_css(&self) -> String {
        critical_css::generate(&self.host, &self.state)
    }

    /// Inline the critical CSS at the top of `<head>`
    pub fn apply_critical_css(&mut self) {
        critical_css::apply(&mut self.host, &self.state);
    }

    /// Snapshot of the counters, load time preferring platform timing
    pub fn get_metrics(&self) -> Metrics {
        let mut metrics = self.state.metrics;
        if let Some(load_time) = self
            .host
            .navigation_timing()
            .and_then(|timing| timing.load_time())
        {
            metrics.load_time = load_time;
        }
        metrics
    }

    /// Deliver a page event to the registered listeners
    pub fn dispatch(&mut self, event: PageEvent) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        let listening = Listener::for_event(&event).is_some_and(|l| self.is_listening(l));

        match event {
            PageEvent::Scroll if listening => {
                self.lazy_loader.on_scroll(&mut self.host, &mut self.state);
            }
            PageEvent::Resize if listening => {
                self.lazy_loader.on_resize(&mut self.host, &mut self.state);
            }
            PageEvent::PointerOver(target) if listening => {
                self.prefetcher
                    .on_pointer_over(&mut self.host, &mut self.state, target);
            }
            PageEvent::Click(target) if listening => {
                outcome.default_prevented =
                    self.scroller.on_click(&mut self.host, &self.state, target);
            }
            PageEvent::AnimationFrame => self.scroller.on_animation_frame(&mut self.host),
            PageEvent::Load if listening => {
                self.listeners.retain(|l| *l != Listener::Load);
                self.on_load();
            }
            _ => {}
        }

        self.run_observers();
        outcome
    }

    /// Let the observers look at the current layout
    fn run_observers(&mut self) {
        self.lazy_loader.deliver(&mut self.host, &mut self.state);
        self.prefetcher.deliver(&mut self.host, &mut self.state);
    }

    fn on_load(&mut self) {
        let load_time = self.host.now() - self.start_time;
        self.state.metrics.load_time = load_time;
        self.state.info(format!("Page loaded in {:.2}ms", load_time));

        if let Some(endpoint) = self.state.config.report_endpoint().map(str::to_string) {
            self.report(&endpoint);
        }
    }

    /// Hand the metrics to the host for fire-and-forget delivery
    fn report(&mut self, endpoint: &str) {
        let url = self.host.document().url().to_string();
        let payload = match MetricsReport::new(self.get_metrics(), &url).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                self.state.warn(format!("Cannot encode metrics: {}", e));
                return;
            }
        };
        self.host.send_beacon(endpoint, &payload);
        self.state.info(format!("Reported metrics to {}", endpoint));
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// Event listeners currently registered, in registration order
    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Whether a scroll animation needs further frames
    pub fn wants_animation_frame(&self) -> bool {
        self.scroller.is_animating()
    }

    pub fn prefetched(&self) -> &PrefetchedSet {
        &self.state.prefetched
    }

    /// Debug messages recorded so far
    pub fn log_messages(&self) -> Vec<ConsoleMessage> {
        self.state.console.messages()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Give the host back
    pub fn into_host(self) -> H {
        self.host
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Capabilities, NavigationTiming, Page};
    use pretty_assertions::assert_eq;

    const HTML: &str = r##"<html><head>
        <script src="https://cdn.example.net/app.js"></script>
        </head><body>
        <img id="hero" data-src="/hero.jpg">
        <a id="about" href="/about">About</a>
        <a id="jump" href="#end">End</a>
        <div style="height: 3000px"></div>
        <img id="late" data-src="/late.jpg">
        <p id="end">End</p>
        </body></html>"##;

    fn page() -> Page {
        Page::builder("https://example.com/", HTML)
            .viewport(1024.0, 768.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_nothing_happens_before_init() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new());
        assert!(!optimizer.is_initialized());
        assert!(optimizer.listeners().is_empty());
        optimizer.dispatch(PageEvent::Scroll);
        assert_eq!(optimizer.get_metrics(), Metrics::default());
    }

    #[test]
    fn test_init_runs_features_once() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new());
        optimizer.init(None);
        let listeners = optimizer.listeners().to_vec();
        let metrics = optimizer.get_metrics();
        optimizer.init(None);

        assert_eq!(listeners, vec![Listener::PointerOver, Listener::Click, Listener::Load]);
        assert_eq!(optimizer.listeners(), listeners.as_slice());
        assert_eq!(optimizer.get_metrics(), metrics);
        assert_eq!(metrics.images_optimized, 1);
        // About link prefetched plus the deferred script
        assert_eq!(metrics.resources_saved, 2);
    }

    #[test]
    fn test_late_options_merge_on_init() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new());
        optimizer.init(Some(ConfigPatch::all_features_off().debug(true)));
        assert_eq!(optimizer.listeners(), &[Listener::Load]);
        assert!(optimizer.config().debug);
        assert!(!optimizer.log_messages().is_empty());
    }

    #[test]
    fn test_load_records_time_once() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new());
        optimizer.host_mut().advance(100.0);
        optimizer.init(None);
        optimizer.host_mut().advance(250.0);
        optimizer.dispatch(PageEvent::Load);
        optimizer.host_mut().advance(250.0);
        optimizer.dispatch(PageEvent::Load);

        assert_eq!(optimizer.get_metrics().load_time, 250.0);
        assert!(!optimizer.listeners().contains(&Listener::Load));
    }

    #[test]
    fn test_navigation_timing_wins() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new());
        optimizer.init(None);
        optimizer.dispatch(PageEvent::Load);
        optimizer.host_mut().set_navigation_timing(NavigationTiming {
            navigation_start: 10.0,
            load_event_end: 910.0,
        });
        assert_eq!(optimizer.get_metrics().load_time, 900.0);
    }

    #[test]
    fn test_beacon_sent_on_load_when_enabled() {
        let patch = ConfigPatch::new()
            .analytics(true)
            .analytics_endpoint("https://stats.example/collect");
        let mut optimizer = Optimizer::new(page(), patch);
        optimizer.init(None);
        optimizer.dispatch(PageEvent::Load);

        let beacons = optimizer.host().beacons();
        assert_eq!(beacons.len(), 1);
        assert_eq!(beacons[0].endpoint, "https://stats.example/collect");
        let payload: serde_json::Value = serde_json::from_str(&beacons[0].payload).unwrap();
        assert_eq!(payload["imagesOptimized"], 1);
        assert_eq!(payload["url"], "https://example.com/");
    }

    #[test]
    fn test_no_beacon_without_endpoint() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new().analytics(true));
        optimizer.init(None);
        optimizer.dispatch(PageEvent::Load);
        assert!(optimizer.host().beacons().is_empty());
    }

    #[test]
    fn test_scroll_reaches_late_image_through_observer() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new());
        optimizer.init(None);
        optimizer.host_mut().scroll_to(2600.0);
        optimizer.dispatch(PageEvent::Scroll);
        assert_eq!(optimizer.get_metrics().images_optimized, 2);
    }

    #[test]
    fn test_click_prevents_default_and_animates() {
        let mut page = page();
        page.set_capabilities(Capabilities {
            intersection_observer: true,
            smooth_scroll: false,
        });
        let mut optimizer = Optimizer::new(page, ConfigPatch::new());
        optimizer.init(None);

        let jump = optimizer.host().document().get_element_by_id("jump").unwrap();
        let outcome = optimizer.dispatch(PageEvent::Click(jump));
        assert!(outcome.default_prevented);
        assert!(optimizer.wants_animation_frame());

        while optimizer.wants_animation_frame() {
            optimizer.host_mut().advance(16.0);
            optimizer.dispatch(PageEvent::AnimationFrame);
        }
        assert!(optimizer.host().viewport().scroll_y > 0.0);
    }

    #[test]
    fn test_manual_operations_degrade_quietly() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new().debug(true));
        optimizer
            .load_image("img[")
            .load_image("#nothing")
            .prefetch("http://[::1")
            .load_image("#late")
            .prefetch("/next")
            .prefetch("/next");

        let metrics = optimizer.get_metrics();
        assert_eq!(metrics.images_optimized, 1);
        assert_eq!(metrics.resources_saved, 1);
        assert_eq!(optimizer.prefetched().len(), 1);
    }

    #[test]
    fn test_debug_toggle_controls_logging() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new());
        optimizer.prefetch("/a");
        assert!(optimizer.log_messages().is_empty());

        optimizer.update_config(ConfigPatch::new().debug(true));
        optimizer.prefetch("/b");
        assert!(!optimizer.log_messages().is_empty());
    }

    #[test]
    fn test_failures_log_as_warnings() {
        let mut optimizer = Optimizer::new(page(), ConfigPatch::new().debug(true));
        optimizer.load_image("img[").prefetch("http://[::1");

        let warnings: Vec<_> = optimizer
            .log_messages()
            .into_iter()
            .filter(|m| m.level == crate::devtools::LogLevel::Warn)
            .map(|m| m.message)
            .collect();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Cannot load image"));
        assert!(warnings[1].starts_with("Cannot prefetch"));
    }

    #[test]
    fn test_extreme_nth_rule_in_critical_css() {
        let page = Page::load(
            "https://example.com/",
            "<html><head><style>li:nth-child(2n-2147483648) { color: red } li:nth-child(-n-2147483648) { color: blue }</style></head>\
             <body><ul><li>One</li><li>Two</li></ul></body></html>",
        )
        .unwrap();
        let optimizer = Optimizer::new(page, ConfigPatch::new());
        assert_eq!(
            optimizer.generate_critical_css(),
            "li:nth-child(2n-2147483648) { color: red; }"
        );
    }
}
