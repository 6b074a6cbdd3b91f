//! Debug console for optimizer diagnostics

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Log level for console messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

impl LogLevel {
    /// Get the display string for the log level
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        }
    }
}

/// A console message
#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    pub level: LogLevel,
    pub message: String,
    /// Wall-clock milliseconds since the Unix epoch
    pub timestamp: u64,
}

impl ConsoleMessage {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            level,
            message: message.into(),
            timestamp,
        }
    }
}

/// Bounded diagnostic log, switched on and off with the `debug` option
///
/// Recording goes through `&self` so read-only operations can still leave a
/// trace. Every recorded message is mirrored to the `log` facade.
pub struct Console {
    messages: RefCell<VecDeque<ConsoleMessage>>,
    max_messages: usize,
    enabled: Cell<bool>,
}

impl Console {
    /// Message prefix, kept so the output is greppable in mixed logs
    pub const PREFIX: &'static str = "[PerformanceOptimizer]";

    pub fn new(enabled: bool) -> Self {
        Self {
            messages: RefCell::new(VecDeque::new()),
            max_messages: 1000,
            enabled: Cell::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    /// Log a debug message
    pub fn debug(&self, message: impl Into<String>) {
        self.record(LogLevel::Debug, message.into());
    }

    /// Log an info message
    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message.into());
    }

    /// Log a warning message
    pub fn warn(&self, message: impl Into<String>) {
        self.record(LogLevel::Warn, message.into());
    }

    fn record(&self, level: LogLevel, message: String) {
        if !self.enabled.get() {
            return;
        }
        match level {
            LogLevel::Debug => log::debug!("{} {}", Self::PREFIX, message),
            LogLevel::Info => log::info!("{} {}", Self::PREFIX, message),
            LogLevel::Warn => log::warn!("{} {}", Self::PREFIX, message),
        }

        let mut messages = self.messages.borrow_mut();
        if messages.len() >= self.max_messages {
            messages.pop_front();
        }
        messages.push_back(ConsoleMessage::new(level, message));
    }

    /// Snapshot of recorded messages, oldest first
    pub fn messages(&self) -> Vec<ConsoleMessage> {
        self.messages.borrow().iter().cloned().collect()
    }

    /// Get message count
    pub fn message_count(&self) -> usize {
        self.messages.borrow().len()
    }

    /// Clear all messages
    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }

    /// Set max messages
    pub fn set_max_messages(&mut self, max: usize) {
        self.max_messages = max;
        let messages = self.messages.get_mut();
        while messages.len() > max {
            messages.pop_front();
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new(false)
    }
}
