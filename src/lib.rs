//! # pagepilot - client-side page performance optimizer
//!
//! Lazy image loading, link prefetching, smooth anchor scrolling, font and
//! resource hints, script deferral and critical-CSS extraction, run against
//! a parsed page through an injectable host.
//!
//! ## Architecture
//!
//! - **optimizer**: the `Optimizer` façade and its features
//! - **host**: capability trait for the page environment, plus `Page`
//! - **renderer**: HTML/CSS parsing, selectors and block layout
//! - **network**: fire-and-forget metrics beacon
//! - **devtools**: debug console
//! - **utils**: shared utilities and error types
//!
//! ```no_run
//! use pagepilot::{ConfigPatch, Optimizer, Page, PageEvent};
//!
//! let page = Page::load("https://example.com/", "<html><body></body></html>")?;
//! let mut optimizer = Optimizer::new(page, ConfigPatch::new().debug(true));
//! optimizer.init(None);
//! optimizer.dispatch(PageEvent::Load);
//! println!("{:?}", optimizer.get_metrics());
//! # Ok::<(), pagepilot::PageError>(())
//! ```

pub mod devtools;
pub mod host;
pub mod network;
pub mod optimizer;
pub mod renderer;
pub mod utils;

// Re-export main types for convenience
pub use host::{Capabilities, Host, NavigationTiming, Page, Viewport};
pub use optimizer::{Config, ConfigPatch, DispatchOutcome, Metrics, Optimizer, PageEvent};
pub use utils::error::{PageError, Result};

/// Crate version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = "pagepilot";
