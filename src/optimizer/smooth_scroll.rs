//! Smooth in-page anchor scrolling

use super::State;
use crate::host::Host;
use crate::renderer::NodeId;

/// Length of the fallback scroll animation
pub const SCROLL_DURATION_MS: f64 = 500.0;

/// Cubic ease-in-out over `t` in [0, 1]
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScrollAnimation {
    start_y: f64,
    distance: f64,
    start_time: f64,
}

#[derive(Default)]
pub(crate) struct SmoothScroller {
    animation: Option<ScrollAnimation>,
}

impl SmoothScroller {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Handle a click; true if the default navigation was cancelled
    pub(crate) fn on_click(&mut self, host: &mut dyn Host, state: &State, target: NodeId) -> bool {
        let document = host.document();
        let Some(link) = document.closest(target, "a") else {
            return false;
        };
        let Some(fragment) = document
            .attribute(link, "href")
            .filter(|href| href.starts_with('#') && *href != "#")
            .map(str::to_string)
        else {
            return false;
        };

        let destination = match document.query_selector(&fragment) {
            Ok(Some(node)) => node,
            Ok(None) => return true,
            Err(e) => {
                state.warn(format!("Cannot scroll to '{}': {}", fragment, e));
                return true;
            }
        };

        if host.capabilities().smooth_scroll {
            host.scroll_into_view_smooth(destination);
        } else {
            self.start(host, destination);
        }
        state.log(format!("Smooth scrolling to {}", fragment));
        true
    }

    fn start(&mut self, host: &dyn Host, destination: NodeId) {
        let Some(rect) = host.bounding_client_rect(destination) else {
            return;
        };
        let start_y = host.viewport().scroll_y;
        self.animation = Some(ScrollAnimation {
            start_y,
            distance: rect.top(),
            start_time: host.now(),
        });
    }

    /// Advance a running animation by one frame
    pub(crate) fn on_animation_frame(&mut self, host: &mut dyn Host) {
        let Some(animation) = self.animation else {
            return;
        };
        let elapsed = host.now() - animation.start_time;
        let progress = ease_in_out_cubic(elapsed / SCROLL_DURATION_MS);
        host.scroll_to(animation.start_y + animation.distance * progress);
        if elapsed >= SCROLL_DURATION_MS {
            self.animation = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Capabilities, Page};
    use crate::optimizer::Config;

    const HTML: &str = r##"<body>
        <a id="jump" href="#target"><span id="label">Go</span></a>
        <a id="bare" href="#">Top</a>
        <a id="missing" href="#nowhere">Missing</a>
        <a id="broken" href="#1st">Broken</a>
        <a id="away" href="/other">Away</a>
        <div style="height: 2000px"></div>
        <section id="target" style="height: 1000px"></section>
        </body>"##;

    fn page(native: bool) -> Page {
        Page::builder("https://example.com/", HTML)
            .viewport(800.0, 600.0)
            .capabilities(Capabilities {
                intersection_observer: true,
                smooth_scroll: native,
            })
            .build()
            .unwrap()
    }

    fn click(page: &mut Page, scroller: &mut SmoothScroller, id: &str) -> bool {
        let node = page.document().get_element_by_id(id).unwrap();
        scroller.on_click(page, &State::new(Config::default()), node)
    }

    #[test]
    fn test_easing_endpoints() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(0.5), 0.5);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!(ease_in_out_cubic(0.25) < 0.25);
        assert!(ease_in_out_cubic(0.75) > 0.75);
    }

    #[test]
    fn test_native_smooth_scroll() {
        let mut page = page(true);
        let mut scroller = SmoothScroller::new();
        assert!(click(&mut page, &mut scroller, "label"));

        let target = page.document().get_element_by_id("target").unwrap();
        assert_eq!(page.smooth_scroll_requests(), &[target]);
        assert!(!scroller.is_animating());
    }

    #[test]
    fn test_ignored_links() {
        let mut page = page(true);
        let mut scroller = SmoothScroller::new();
        assert!(!click(&mut page, &mut scroller, "bare"));
        assert!(!click(&mut page, &mut scroller, "away"));
        // Default is cancelled even when the fragment has no target
        assert!(click(&mut page, &mut scroller, "missing"));
        assert!(click(&mut page, &mut scroller, "broken"));
        assert!(page.smooth_scroll_requests().is_empty());
    }

    #[test]
    fn test_animated_fallback() {
        let mut page = page(false);
        let mut scroller = SmoothScroller::new();
        let target = page.document().get_element_by_id("target").unwrap();
        let destination = page.document_rect(target).unwrap().top();

        assert!(click(&mut page, &mut scroller, "jump"));
        assert!(scroller.is_animating());

        page.advance(250.0);
        scroller.on_animation_frame(&mut page);
        let halfway = page.viewport().scroll_y;
        assert!((halfway - destination / 2.0).abs() < 1e-6);

        page.advance(300.0);
        scroller.on_animation_frame(&mut page);
        assert_eq!(page.viewport().scroll_y, destination);
        assert!(!scroller.is_animating());
    }
}
