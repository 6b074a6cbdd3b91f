//! Page events delivered to the optimizer

use crate::renderer::NodeId;

/// Something that happened on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    Scroll,
    Resize,
    /// Pointer moved onto the node
    PointerOver(NodeId),
    /// Primary click on the node
    Click(NodeId),
    /// The host is about to paint a frame
    AnimationFrame,
    /// The load event
    Load,
}

/// Kind of event listener the optimizer has registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Listener {
    Scroll,
    Resize,
    PointerOver,
    Click,
    /// Removed after it has fired once
    Load,
}

impl Listener {
    /// The listener kind an event is delivered to, if any
    pub fn for_event(event: &PageEvent) -> Option<Listener> {
        match event {
            PageEvent::Scroll => Some(Listener::Scroll),
            PageEvent::Resize => Some(Listener::Resize),
            PageEvent::PointerOver(_) => Some(Listener::PointerOver),
            PageEvent::Click(_) => Some(Listener::Click),
            PageEvent::Load => Some(Listener::Load),
            PageEvent::AnimationFrame => None,
        }
    }
}

/// What the page should do after an event was dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// The default action (e.g. following a link) was cancelled
    pub default_prevented: bool,
}
