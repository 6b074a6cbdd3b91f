//! Layout engine for computing element positions and sizes
//!
//! A deliberately small block-flow model: every rendered element is stacked
//! vertically inside its parent and fills the parent's width. Heights come
//! from an explicit `height` (attribute or inline style), from text line
//! count, or from the sum of the children.

use super::css::CssParser;
use super::dom::{Document, NodeId, NodeType};
use std::collections::HashMap;

/// Rectangle for positioning
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Same rectangle shifted by (-dx, -dy)
    pub fn offset(&self, dx: f64, dy: f64) -> Rect {
        Rect::new(self.x - dx, self.y - dy, self.width, self.height)
    }

    /// Overlapping part of two rectangles, if any (edges count)
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let right = self.right().min(other.right());
        let top = self.top().max(other.top());
        let bottom = self.bottom().min(other.bottom());
        if left <= right && top <= bottom {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    /// Area of the rectangle
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Display type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayType {
    Block,
    Inline,
    InlineBlock,
    None,
}

/// Default font metrics for text layout
#[derive(Debug, Clone, Copy)]
pub struct FontMetrics {
    /// Font size in pixels
    pub size: f64,
    /// Line height multiplier
    pub line_height: f64,
    /// Average character width (approximation)
    pub char_width: f64,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            size: 16.0,
            line_height: 1.2,
            char_width: 8.0,
        }
    }
}

/// Boxes produced by a layout pass, in document coordinates
#[derive(Debug, Clone, Default)]
pub struct Layout {
    boxes: HashMap<NodeId, Rect>,
    document_height: f64,
}

impl Layout {
    /// Border box of an element, `None` if it is not rendered
    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.boxes.get(&id).copied()
    }

    /// Override the box of an element
    pub fn set_rect(&mut self, id: NodeId, rect: Rect) {
        self.document_height = self.document_height.max(rect.bottom());
        self.boxes.insert(id, rect);
    }

    /// Total scrollable height
    pub fn document_height(&self) -> f64 {
        self.document_height
    }
}

/// Layout engine for computing the box of every rendered element
pub struct LayoutEngine {
    viewport_width: f64,
    font_metrics: FontMetrics,
    style_parser: CssParser,
}

impl LayoutEngine {
    /// Create a new layout engine
    pub fn new(viewport_width: f64) -> Self {
        Self {
            viewport_width,
            font_metrics: FontMetrics::default(),
            style_parser: CssParser::new(),
        }
    }

    /// Set font metrics
    pub fn set_font_metrics(&mut self, metrics: FontMetrics) {
        self.font_metrics = metrics;
    }

    /// Compute layout for a document
    pub fn compute(&self, document: &Document) -> Layout {
        let mut layout = Layout::default();
        let mut y = 0.0;
        for child in document.children(document.root()) {
            y += self.layout_node(document, *child, 0.0, y, self.viewport_width, &mut layout);
        }
        layout.document_height = layout.document_height.max(y);
        layout
    }

    /// Lay out one node at (x, y); returns the height it occupies
    fn layout_node(
        &self,
        document: &Document,
        id: NodeId,
        x: f64,
        y: f64,
        width: f64,
        layout: &mut Layout,
    ) -> f64 {
        let Some(node) = document.node(id) else {
            return 0.0;
        };
        match &node.node_type {
            NodeType::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    self.calculate_text_lines(trimmed, width) as f64 * self.line_height()
                }
            }
            NodeType::Comment(_) | NodeType::Document => 0.0,
            NodeType::Element(element) => {
                let inline_style = element
                    .get_attribute("style")
                    .map(|s| self.style_parser.parse_inline_style(s))
                    .unwrap_or_default();
                let style_value = |name: &str| {
                    inline_style
                        .iter()
                        .rev()
                        .find(|d| d.property == name)
                        .map(|d| d.value.clone())
                };

                let display = match style_value("display").as_deref() {
                    Some("none") => DisplayType::None,
                    _ => self.get_display_type(&element.tag_name),
                };
                if display == DisplayType::None || element.has_attribute("hidden") {
                    return 0.0;
                }

                let explicit_width = style_value("width")
                    .as_deref()
                    .and_then(parse_px)
                    .or_else(|| element.get_attribute("width").and_then(parse_px));
                let explicit_height = style_value("height")
                    .as_deref()
                    .and_then(parse_px)
                    .or_else(|| element.get_attribute("height").and_then(parse_px));
                let box_width = explicit_width.unwrap_or(width).min(width.max(0.0));

                let mut children_height = 0.0;
                for child in document.children(id) {
                    children_height +=
                        self.layout_node(document, *child, x, y + children_height, box_width, layout);
                }

                let height = explicit_height.unwrap_or_else(|| {
                    if is_replaced(&element.tag_name) {
                        150.0
                    } else {
                        children_height
                    }
                });
                layout.set_rect(id, Rect::new(x, y, box_width, height));
                height
            }
        }
    }

    fn line_height(&self) -> f64 {
        self.font_metrics.size * self.font_metrics.line_height
    }

    /// Get display type for an element
    fn get_display_type(&self, tag_name: &str) -> DisplayType {
        match tag_name {
            "span" | "a" | "strong" | "em" | "b" | "i" | "u" | "code" | "small" | "sub" | "sup"
            | "label" | "abbr" | "cite" | "q" => DisplayType::Inline,
            "img" | "button" | "input" | "select" | "textarea" | "video" | "iframe" | "canvas" => {
                DisplayType::InlineBlock
            }
            "head" | "meta" | "title" | "link" | "style" | "script" | "noscript" | "template"
            | "base" => DisplayType::None,
            _ => DisplayType::Block,
        }
    }

    /// Calculate number of text lines
    fn calculate_text_lines(&self, text: &str, available_width: f64) -> usize {
        if available_width <= 0.0 {
            return 1;
        }
        let chars_per_line = (available_width / self.font_metrics.char_width).floor() as usize;
        if chars_per_line == 0 {
            return 1;
        }
        text.chars().count().div_ceil(chars_per_line).max(1)
    }
}

fn is_replaced(tag_name: &str) -> bool {
    matches!(tag_name, "img" | "video" | "iframe" | "canvas")
}

/// Parse `900`, `900px` or `900.5px`
fn parse_px(value: &str) -> Option<f64> {
    let value = value.trim();
    value
        .strip_suffix("px")
        .unwrap_or(value)
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::HtmlParser;
    use url::Url;

    fn layout(html: &str) -> (Document, Layout) {
        let doc = HtmlParser::new()
            .parse(html, Url::parse("https://example.com/").unwrap())
            .unwrap();
        let layout = LayoutEngine::new(1000.0).compute(&doc);
        (doc, layout)
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 100.0, 100.0);
        let b = Rect::new(50.0, 50.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(50.0, 50.0, 50.0, 50.0)));
        assert_eq!(a.intersection(&Rect::new(0.0, 200.0, 10.0, 10.0)), None);
    }

    #[test]
    fn test_blocks_stack_vertically() {
        let (doc, layout) = layout(
            r#"<body><div id="a" style="height: 500px"></div><div id="b" height="300"></div><img id="c"></body>"#,
        );
        let a = layout.rect(doc.get_element_by_id("a").unwrap()).unwrap();
        let b = layout.rect(doc.get_element_by_id("b").unwrap()).unwrap();
        let c = layout.rect(doc.get_element_by_id("c").unwrap()).unwrap();
        assert_eq!(a, Rect::new(0.0, 0.0, 1000.0, 500.0));
        assert_eq!(b.top(), 500.0);
        assert_eq!(c.top(), 800.0);
        assert_eq!(c.height, 150.0);
        assert_eq!(layout.document_height(), 950.0);
    }

    #[test]
    fn test_hidden_elements_have_no_box() {
        let (doc, layout) = layout(
            r#"<head><script src="a.js"></script></head><body><p id="p" style="display: none">x</p></body>"#,
        );
        let script = doc.elements_by_tag("script")[0];
        assert!(layout.rect(script).is_none());
        assert!(layout.rect(doc.get_element_by_id("p").unwrap()).is_none());
    }

    #[test]
    fn test_text_lines_calculation() {
        let engine = LayoutEngine::new(1000.0);
        // With default char_width of 8.0, 100px fits 12 chars
        assert_eq!(engine.calculate_text_lines("Hello", 100.0), 1);
        assert_eq!(engine.calculate_text_lines("Hello World Test", 100.0), 2);
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("900px"), Some(900.0));
        assert_eq!(parse_px(" 12.5 "), Some(12.5));
        assert_eq!(parse_px("50%"), None);
    }
}
