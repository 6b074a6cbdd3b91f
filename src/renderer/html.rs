//! HTML5 parsing (html5ever) and serialization for the arena DOM

use super::dom::{Document, NodeId, NodeType};
use crate::utils::{PageError, Result};
use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use url::Url;

/// Elements that never have content or an end tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is emitted verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "xmp", "iframe"];

/// HTML5 parser using html5ever
pub struct HtmlParser {
    opts: ParseOpts,
}

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self {
            opts: ParseOpts {
                tree_builder: TreeBuilderOpts {
                    drop_doctype: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        }
    }

    /// Parse HTML content into a DOM document loaded from `url`
    pub fn parse(&self, content: &str, url: Url) -> Result<Document> {
        let dom = parse_document(RcDom::default(), self.opts.clone())
            .from_utf8()
            .read_from(&mut content.as_bytes())
            .map_err(|e| PageError::HtmlParse(e.to_string()))?;

        let mut document = Document::new(url);
        let root = document.root();
        for child in dom.document.children.borrow().iter() {
            Self::convert_node(&mut document, root, child);
        }
        Ok(document)
    }

    fn convert_node(document: &mut Document, parent: NodeId, handle: &Handle) {
        let id = match &handle.data {
            NodeData::Element { name, attrs, .. } => {
                let id = document.create_element(&name.local);
                if let Some(element) = document.element_mut(id) {
                    for attr in attrs.borrow().iter() {
                        element.set_attribute(attr.name.local.to_string(), attr.value.to_string());
                    }
                }
                id
            }
            NodeData::Text { contents } => document.create_text(contents.borrow().to_string()),
            NodeData::Comment { contents } => document.create_comment(contents.to_string()),
            NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {
                return;
            }
        };
        document.append_child(parent, id);
        for child in handle.children.borrow().iter() {
            Self::convert_node(document, id, child);
        }

        if let NodeData::Element {
            template_contents, ..
        } = &handle.data
        {
            if let Some(contents) = template_contents.borrow().as_ref() {
                let fragment = document.ensure_template_content(id);
                for child in contents.children.borrow().iter() {
                    Self::convert_node(document, fragment, child);
                }
            }
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Serialize the connected tree back to HTML markup
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        for child in self.children(self.root()) {
            self.write_node(*child, false, &mut out);
        }
        out
    }

    /// Serialize a single node (outer HTML)
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, false, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, raw_text: bool, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.node_type {
            NodeType::Document => {}
            NodeType::Text(text) if raw_text => out.push_str(text),
            NodeType::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeType::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeType::Element(element) => {
                out.push('<');
                out.push_str(&element.tag_name);
                for attr in &element.attributes {
                    out.push(' ');
                    out.push_str(&attr.name);
                    if !attr.value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&html_escape::encode_double_quoted_attribute(&attr.value));
                        out.push('"');
                    }
                }
                out.push('>');
                let tag = element.tag_name.as_str();
                if VOID_ELEMENTS.contains(&tag) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&tag);
                for child in self.children(id) {
                    self.write_node(*child, raw, out);
                }
                if let Some(fragment) = self.template_content(id) {
                    for child in self.children(fragment) {
                        self.write_node(*child, false, out);
                    }
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(html: &str) -> Document {
        HtmlParser::new()
            .parse(html, Url::parse("https://example.com/").unwrap())
            .unwrap()
    }

    #[test]
    fn test_parse_empty_html() {
        let doc = parse("");
        // html5ever always synthesizes html/head/body
        assert!(doc.head().is_some());
        assert!(doc.body().is_some());
    }

    #[test]
    fn test_parse_with_attributes() {
        let doc = parse(r#"<div id="main" class="container">Content</div>"#);
        let div = doc.get_element_by_id("main").unwrap();
        let el = doc.element(div).unwrap();
        assert_eq!(el.classes(), vec!["container"]);
        assert_eq!(doc.text_content(div), "Content");
    }

    #[test]
    fn test_parse_places_scripts_and_links() {
        let doc = parse(
            r#"<html><head><link rel="stylesheet" href="/a.css"><script src="/a.js"></script></head>
            <body><img data-src="/x.png"></body></html>"#,
        );
        assert_eq!(doc.elements_by_tag("link").len(), 1);
        assert_eq!(doc.elements_by_tag("script").len(), 1);
        let img = doc.elements_by_tag("img")[0];
        assert_eq!(doc.attribute(img, "data-src"), Some("/x.png"));
    }

    #[test]
    fn test_parse_malformed_html() {
        // html5ever should handle malformed HTML gracefully
        let doc = parse("<p>Unclosed paragraph<div>Another");
        assert_eq!(doc.elements_by_tag("p").len(), 1);
        assert_eq!(doc.elements_by_tag("div").len(), 1);
    }

    #[test]
    fn test_serialize_round_trip_structure() {
        let doc = parse(
            r#"<html><head><style>a > b { color: red }</style></head><body><p class="x">a &amp; b</p><img src="i.png"></body></html>"#,
        );
        let html = doc.to_html();
        assert!(html.starts_with("<!DOCTYPE html><html><head>"));
        assert!(html.contains("<style>a > b { color: red }</style>"));
        assert!(html.contains(r#"<p class="x">a &amp; b</p>"#));
        assert!(html.contains(r#"<img src="i.png">"#));
        assert!(!html.contains("</img>"));
    }

    #[test]
    fn test_template_content_is_kept_but_inert() {
        let doc = parse(
            r#"<body><template id="row"><li><img data-src="/t.png"></li></template></body>"#,
        );
        let template = doc.get_element_by_id("row").unwrap();
        assert!(doc.children(template).is_empty());
        assert!(doc.elements_by_tag("img").is_empty());

        let fragment = doc.template_content(template).unwrap();
        assert!(!doc.is_connected(fragment));
        assert_eq!(
            doc.outer_html(template),
            r#"<template id="row"><li><img data-src="/t.png"></li></template>"#
        );
    }

    #[test]
    fn test_boolean_attribute_serialization() {
        let doc = parse(r#"<script src="/a.js" defer></script>"#);
        let script = doc.elements_by_tag("script")[0];
        assert_eq!(doc.outer_html(script), r#"<script src="/a.js" defer></script>"#);
    }
}
