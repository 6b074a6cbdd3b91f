//! Document model for pagepilot
//!
//! HTML parsing into an arena DOM, stylesheet and selector handling, and the
//! block layout that gives every rendered element a box.

pub mod css;
mod dom;
pub mod html;
mod layout;
pub mod selector;

pub use css::{CssParser, CssRule, Declaration, FontFaceRule, KeyframesRule, StyleRule, StyleSheet};
pub use dom::{Attribute, Document, ElementData, Node, NodeId, NodeType};
pub use html::HtmlParser;
pub use layout::{DisplayType, FontMetrics, Layout, LayoutEngine, Rect};
pub use selector::SelectorList;
