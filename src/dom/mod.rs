//! Page model - the element tree the runtime operates on
//!
//! The host page owns the tree; the runtime only reads it and mutates
//! a small set of attributes and classes on nodes it is handed.
//! - `Document` - arena of elements addressed by `NodeId`
//! - `Selector` - the selector subset used for discovery and wiring

pub mod selector;

pub use selector::{Selector, SelectorError};

use std::collections::BTreeMap;

/// Handle to an element in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A single element
#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    classes: Vec<String>,
    styles: BTreeMap<String, String>,
    hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            classes: Vec::new(),
            styles: BTreeMap::new(),
            hidden: false,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// In-memory element tree with an `html` root and a `body`
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    html: NodeId,
    body: NodeId,
    active: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: vec![Node::new("html")],
            html: NodeId(0),
            body: NodeId(0),
            active: None,
        };
        doc.body = doc.append_element(doc.html, "body");
        doc
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tree structure
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    /// Append `child` as the last child of `parent`, detaching it first
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.contains(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Create an element and append it to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let child = self.create_element(tag);
        self.append_child(parent, child);
        child
    }

    /// Remove `node` from its parent; the subtree stays intact but unreachable
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
        if self.active.is_some_and(|a| self.contains(node, a)) {
            self.active = None;
        }
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.0].tag
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Ancestors of `id`, nearest first, not including `id`
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.parent(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Descendants of `id` in document order, not including `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Whether `node` is `ancestor` or lies inside it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).contains(&ancestor)
    }

    /// Every attached element in document order, starting at `html`
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = vec![self.html];
        out.extend(self.descendants(self.html));
        out
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Attributes, classes, style
    // ─────────────────────────────────────────────────────────────────────────

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id.0].attrs.get(name).map(String::as_str)
    }

    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.nodes[id.0].attrs.contains_key(name)
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        self.nodes[id.0]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.nodes[id.0].attrs.remove(name)
    }

    /// The element's `id` attribute
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id")
    }

    pub fn classes(&self, id: NodeId) -> &[String] {
        &self.nodes[id.0].classes
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.nodes[id.0].classes.iter().any(|c| c == class)
    }

    /// Add a class; adding one already present is a no-op
    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if class.is_empty() || self.has_class(id, class) {
            return;
        }
        self.nodes[id.0].classes.push(class.to_string());
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        self.nodes[id.0].classes.retain(|c| c != class);
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.nodes[id.0].styles.get(property).map(String::as_str)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        self.nodes[id.0]
            .styles
            .insert(property.to_string(), value.to_string());
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        self.nodes[id.0].hidden = hidden;
    }

    /// Visible when neither the node nor any ancestor is hidden or `display: none`
    pub fn is_visible(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .all(|n| !self.nodes[n.0].hidden && self.style(n, "display") != Some("none"))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// First attached element whose `id` attribute equals `element_id`
    pub fn get_element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|n| self.element_id(*n) == Some(element_id))
    }

    /// Elements matching `selector` in document order
    ///
    /// With a scope only its descendants are searched; without one the whole
    /// document is, `html` included.
    pub fn query_all(&self, scope: Option<NodeId>, selector: &Selector) -> Vec<NodeId> {
        let candidates = match scope {
            Some(scope) => self.descendants(scope),
            None => self.document_order(),
        };
        candidates
            .into_iter()
            .filter(|n| selector.matches(self, *n))
            .collect()
    }

    pub fn query(&self, scope: Option<NodeId>, selector: &Selector) -> Option<NodeId> {
        self.query_all(scope, selector).into_iter().next()
    }

    /// Parse `selector` and run [`Document::query_all`]
    pub fn select_all(
        &self,
        scope: Option<NodeId>,
        selector: &str,
    ) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self.query_all(scope, &selector))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Focus
    // ─────────────────────────────────────────────────────────────────────────

    /// The element currently holding focus
    pub fn active_element(&self) -> Option<NodeId> {
        self.active
    }

    pub(crate) fn set_active(&mut self, node: Option<NodeId>) {
        self.active = node;
    }
}
