//! Cooldown-window rate limiting for event handlers
//!
//! A call is let through only if at least `window` milliseconds have passed
//! since the last call that was let through. Calls arriving too soon are
//! dropped, never queued or coalesced.

/// Drops calls that arrive within a cooldown window of the last accepted call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Throttle {
    window_ms: f64,
    last_accepted: Option<f64>,
}

impl Throttle {
    /// Create a throttle with the given cooldown window in milliseconds
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            last_accepted: None,
        }
    }

    /// Try to pass a call at time `now_ms`; records it when accepted
    pub fn try_acquire(&mut self, now_ms: f64) -> bool {
        match self.last_accepted {
            Some(last) if now_ms - last < self.window_ms => false,
            _ => {
                self.last_accepted = Some(now_ms);
                true
            }
        }
    }

    /// Run `f` if the call is accepted at `now_ms`
    pub fn call<R>(&mut self, now_ms: f64, f: impl FnOnce() -> R) -> Option<R> {
        if self.try_acquire(now_ms) {
            Some(f())
        } else {
            None
        }
    }
}
