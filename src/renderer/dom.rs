//! DOM (Document Object Model) implementation
//!
//! Nodes live in an arena owned by the [`Document`] and are addressed by
//! [`NodeId`]. A detached node stays in the arena but is no longer reachable
//! from the root, so it never shows up in traversals.

use super::css::StyleSheet;
use super::selector::SelectorList;
use crate::utils::Result;
use url::Url;

/// Handle to a node inside a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Arena index of the node
    pub fn index(self) -> usize {
        self.0
    }
}

/// Node types in the DOM
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// Document root
    Document,
    /// Element node (e.g., <div>)
    Element(ElementData),
    /// Text node
    Text(String),
    /// Comment node
    Comment(String),
}

/// A single element attribute, kept in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Data for element nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Tag name, lowercase (e.g., "div", "span")
    pub tag_name: String,
    /// Element attributes in insertion order
    pub attributes: Vec<Attribute>,
}

impl ElementData {
    /// Create a new element
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into().to_ascii_lowercase(),
            attributes: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Get an attribute value
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Whether the attribute is present (any value)
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    /// Set an attribute value, replacing an existing one in place
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let pos = self.attributes.iter().position(|a| a.name == name)?;
        Some(self.attributes.remove(pos).value)
    }

    /// Get the ID attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attribute("id")
    }

    /// Get class names
    pub fn classes(&self) -> Vec<&str> {
        self.get_attribute("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Whether the element carries the given class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    /// Add a class name if not already present
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let value = match self.get_attribute("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing.trim(), class),
            _ => class.to_string(),
        };
        self.set_attribute("class", value);
    }
}

/// A node in the DOM tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Node type and data
    pub node_type: NodeType,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Fragment with the inert content of a `<template>`
    template_content: Option<NodeId>,
}

impl Node {
    fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            parent: None,
            children: Vec::new(),
            template_content: None,
        }
    }

    /// Check if this is an element node
    pub fn is_element(&self) -> bool {
        matches!(self.node_type, NodeType::Element(_))
    }

    /// Get element data if this is an element
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.node_type {
            NodeType::Element(data) => Some(data),
            _ => None,
        }
    }
}

/// The DOM document
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    url: Url,
    style_sheets: Vec<StyleSheet>,
}

impl Document {
    /// Create a new empty document for the given page URL
    pub fn new(url: Url) -> Self {
        Self {
            nodes: vec![Node::new(NodeType::Document)],
            url,
            style_sheets: Vec::new(),
        }
    }

    /// Stylesheets in document order
    pub fn style_sheets(&self) -> &[StyleSheet] {
        &self.style_sheets
    }

    /// Mutable access to the stylesheets
    pub fn style_sheets_mut(&mut self) -> &mut [StyleSheet] {
        &mut self.style_sheets
    }

    /// Attach a stylesheet after the existing ones
    pub fn add_style_sheet(&mut self, sheet: StyleSheet) {
        self.style_sheets.push(sheet);
    }

    /// URL the document was loaded from
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Get a node by handle
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Get element data for a node
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.node(id).and_then(Node::as_element)
    }

    /// Get mutable element data for a node
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.0).map(|n| &mut n.node_type) {
            Some(NodeType::Element(data)) => Some(data),
            _ => None,
        }
    }

    /// Tag name of an element node
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag_name.as_str())
    }

    /// Attribute value of an element node
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.get_attribute(name))
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Element children of a node
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    fn push(&mut self, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(node_type));
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(NodeType::Element(ElementData::new(tag_name)))
    }

    /// Create a detached element from prepared element data
    pub fn create_element_with(&mut self, data: ElementData) -> NodeId {
        self.push(NodeType::Element(data))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeType::Text(text.into()))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeType::Comment(text.into()))
    }

    /// Content fragment of a `<template>`; never reachable from the root
    pub fn template_content(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.template_content)
    }

    /// Content fragment of `template`, created on first use
    pub fn ensure_template_content(&mut self, template: NodeId) -> NodeId {
        if let Some(fragment) = self.template_content(template) {
            return fragment;
        }
        let fragment = self.push(NodeType::Document);
        if let Some(node) = self.nodes.get_mut(template.0) {
            node.template_content = Some(fragment);
        }
        fragment
    }

    /// Remove a node from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.nodes[parent.0].children.retain(|c| *c != id);
            self.nodes[id.0].parent = None;
        }
    }

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` as the first child of `parent`
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        let first = self.children(parent).first().copied();
        self.insert_before(parent, child, first);
    }

    /// Insert `child` into `parent` before `reference` (or at the end)
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || child.0 >= self.nodes.len() || parent.0 >= self.nodes.len() {
            return;
        }
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let pos = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(pos, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Put `new` where `old` currently is; `old` becomes detached
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> bool {
        let Some(parent) = self.parent(old) else {
            return false;
        };
        self.insert_before(parent, new, Some(old));
        self.detach(old);
        true
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root() {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// All nodes under `id` in document (pre-)order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// All connected elements in document order
    pub fn elements(&self) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.element(*id).is_some())
            .collect()
    }

    /// All connected elements with the given tag name
    pub fn elements_by_tag(&self, tag_name: &str) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|id| self.tag_name(*id) == Some(tag_name))
            .collect()
    }

    /// The `<html>` element
    pub fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root()).into_iter().next()
    }

    /// The `<head>` element
    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|id| self.tag_name(*id) == Some("head"))
    }

    /// The `<body>` element
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.element_children(html)
            .into_iter()
            .find(|id| self.tag_name(*id) == Some("body"))
    }

    /// Element with the given id attribute
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|node| self.element(*node).and_then(ElementData::id) == Some(id))
    }

    /// Nearest inclusive ancestor element with the given tag name
    pub fn closest(&self, id: NodeId, tag_name: &str) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.tag_name(node) == Some(tag_name) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        if let Some(Node {
            node_type: NodeType::Text(t),
            ..
        }) = self.node(id)
        {
            text.push_str(t);
        }
        for node in self.descendants(id) {
            if let Some(Node {
                node_type: NodeType::Text(t),
                ..
            }) = self.node(node)
            {
                text.push_str(t);
            }
        }
        text
    }

    /// Replace every child of `id` with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: impl Into<String>) {
        for child in self.children(id).to_vec() {
            self.detach(child);
        }
        let text = self.create_text(text);
        self.append_child(id, text);
    }

    /// First element matching a CSS selector
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>> {
        let selectors = SelectorList::parse(selector)?;
        Ok(self
            .elements()
            .into_iter()
            .find(|id| selectors.matches(self, *id)))
    }

    /// All elements matching a CSS selector, in document order
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        let selectors = SelectorList::parse(selector)?;
        Ok(self
            .elements()
            .into_iter()
            .filter(|id| selectors.matches(self, *id))
            .collect())
    }

    /// Resolve a possibly relative URL against the document URL
    pub fn resolve_url(&self, href: &str) -> Result<Url> {
        self.url
            .join(href)
            .map_err(|e| crate::utils::PageError::invalid_url(href, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(Url::parse("https://example.com/").unwrap())
    }

    #[test]
    fn test_attribute_order_preserved() {
        let mut el = ElementData::new("SCRIPT");
        el.set_attribute("src", "/a.js");
        el.set_attribute("id", "x");
        el.set_attribute("src", "/b.js");
        assert_eq!(el.tag_name, "script");
        assert_eq!(el.attributes[0].name, "src");
        assert_eq!(el.get_attribute("src"), Some("/b.js"));
        assert_eq!(el.remove_attribute("src"), Some("/b.js".to_string()));
        assert!(!el.has_attribute("src"));
    }

    #[test]
    fn test_add_class() {
        let mut el = ElementData::new("img").with_attribute("class", "hero");
        el.add_class("loaded");
        el.add_class("loaded");
        assert_eq!(el.get_attribute("class"), Some("hero loaded"));
    }

    #[test]
    fn test_tree_mutation() {
        let mut doc = doc();
        let root = doc.root();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let a = doc.create_element("meta");
        let b = doc.create_element("title");
        doc.append_child(root, html);
        doc.append_child(html, head);
        doc.append_child(head, a);
        doc.prepend_child(head, b);

        assert_eq!(doc.head(), Some(head));
        assert_eq!(doc.children(head), &[b, a]);

        let c = doc.create_element("link");
        assert!(doc.replace_child(a, c));
        assert_eq!(doc.children(head), &[b, c]);
        assert!(!doc.is_connected(a));
        assert!(doc.is_connected(c));
    }

    #[test]
    fn test_descendants_document_order() {
        let mut doc = doc();
        let root = doc.root();
        let html = doc.create_element("html");
        let body = doc.create_element("body");
        let p1 = doc.create_element("p");
        let span = doc.create_element("span");
        let p2 = doc.create_element("p");
        doc.append_child(root, html);
        doc.append_child(html, body);
        doc.append_child(body, p1);
        doc.append_child(p1, span);
        doc.append_child(body, p2);

        assert_eq!(doc.elements(), vec![html, body, p1, span, p2]);
        assert_eq!(doc.elements_by_tag("p"), vec![p1, p2]);
        assert_eq!(doc.closest(span, "body"), Some(body));
        assert_eq!(doc.closest(span, "a"), None);
    }

    #[test]
    fn test_resolve_url() {
        let doc = doc();
        assert_eq!(
            doc.resolve_url("/about").unwrap().as_str(),
            "https://example.com/about"
        );
        assert!(doc.resolve_url("http://[::1").is_err());
    }
}
