//! Viewport intersection observation

use crate::host::Host;
use crate::renderer::{NodeId, Rect};
use std::collections::HashSet;

/// Watches elements against the viewport grown by a margin on every side
///
/// [`take_entries`](Self::take_entries) reports each target once per
/// transition from outside to inside; targets stay observed until
/// [`unobserve`](Self::unobserve) is called.
#[derive(Debug, Clone)]
pub struct IntersectionObserver {
    root_margin: f64,
    threshold: f64,
    targets: Vec<NodeId>,
    intersecting: HashSet<NodeId>,
}

impl IntersectionObserver {
    /// `threshold` is the visible fraction of the target, 0.0 for any overlap
    pub fn new(root_margin: f64, threshold: f64) -> Self {
        Self {
            root_margin,
            threshold,
            targets: Vec::new(),
            intersecting: HashSet::new(),
        }
    }

    pub fn observe(&mut self, target: NodeId) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    pub fn unobserve(&mut self, target: NodeId) {
        self.targets.retain(|t| *t != target);
        self.intersecting.remove(&target);
    }

    pub fn targets(&self) -> &[NodeId] {
        &self.targets
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets that became intersecting since the last call
    pub fn take_entries(&mut self, host: &dyn Host) -> Vec<NodeId> {
        let viewport = host.viewport();
        let root = Rect::new(
            -self.root_margin,
            -self.root_margin,
            viewport.width + 2.0 * self.root_margin,
            viewport.height + 2.0 * self.root_margin,
        );

        let mut entries = Vec::new();
        for &target in &self.targets {
            let visible = host
                .bounding_client_rect(target)
                .is_some_and(|rect| self.crosses_threshold(&rect, &root));
            if visible {
                if self.intersecting.insert(target) {
                    entries.push(target);
                }
            } else {
                self.intersecting.remove(&target);
            }
        }
        entries
    }

    fn crosses_threshold(&self, rect: &Rect, root: &Rect) -> bool {
        let Some(overlap) = rect.intersection(root) else {
            return false;
        };
        let area = rect.area();
        if area <= 0.0 {
            // Empty boxes count as fully visible once they touch the root
            return true;
        }
        overlap.area() / area >= self.threshold
    }
}
