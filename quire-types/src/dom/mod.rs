//! Arena-backed HTML tree.
//!
//! The build pipeline converts markdown into a [`Dom`] and rewrites it in
//! place; the runtime parses served markup into a [`Dom`] and layers overlays
//! on top of it. Nodes are never freed: detaching a node only unlinks it from
//! its parent, so a [`NodeId`] stays valid (and comparable) for the lifetime of
//! the tree. That makes node ids usable as stable identities in visited sets
//! and lifecycle tables.

mod parse;
mod selector;
mod serialize;

pub use selector::Selector;
pub use serialize::{escape_attr, escape_text, is_void_element};

/// Handle to a node in a [`Dom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An element's tag name and attributes, in authored order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(k, _)| k == name)?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attr("class", joined);
    }
}

/// Content of a single node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(Element),
    Text(String),
    /// Pre-rendered markup, serialized verbatim
    Raw(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An HTML tree stored in an arena
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<NodeData>,
}

impl Dom {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse an HTML fragment into a fresh tree
    pub fn parse_fragment(html: &str) -> Self {
        let mut dom = Dom::new();
        let root = dom.root();
        dom.append_html(root, html);
        dom
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    // ---------------------------------------------------------------------
    // Node creation
    // ---------------------------------------------------------------------

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_raw(&mut self, markup: impl Into<String>) -> NodeId {
        self.push(NodeKind::Raw(markup.into()))
    }

    /// Create an element with a single text child
    pub fn create_element_with_text(&mut self, element: Element, text: &str) -> NodeId {
        let id = self.create_element(element);
        let text = self.create_text(text);
        self.append_child(id, text);
        id
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    pub fn is_tag(&self, id: NodeId, tag: &str) -> bool {
        self.tag(id) == Some(tag)
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|el| el.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id).and_then(|el| el.remove_attr(name))
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|el| el.has_class(class))
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(el) = self.element_mut(id) {
            el.add_class(class);
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.first().copied()
    }

    /// Child elements only (text and raw nodes skipped)
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// True when the node is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root() {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// All descendants of `id` in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Attached elements matching `selector`, in document order
    pub fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.select_within(self.root(), selector)
    }

    pub fn select_within(&self, scope: NodeId, selector: &Selector) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(|el| selector.matches(el)))
            .collect()
    }

    pub fn select_first_within(&self, scope: NodeId, selector: &Selector) -> Option<NodeId> {
        self.select_within(scope, selector).into_iter().next()
    }

    /// Concatenated text of a subtree; raw markup contributes nothing
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Raw(_) => {}
            NodeKind::Root | NodeKind::Element(_) => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Text of a subtree as a reader sees it: element boundaries separate
    /// words, runs of whitespace collapse to one space.
    pub fn visible_text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        self.collect_spaced(id, &mut raw);
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn collect_spaced(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Raw(_) => {}
            NodeKind::Root => {
                for child in &self.nodes[id.0].children {
                    self.collect_spaced(*child, out);
                }
            }
            NodeKind::Element(el) => {
                let inline = is_inline(&el.tag);
                if !inline {
                    out.push(' ');
                }
                for child in &self.nodes[id.0].children {
                    self.collect_spaced(*child, out);
                }
                if !inline {
                    out.push(' ');
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Mutation
    // ---------------------------------------------------------------------

    /// Unlink a node from its parent. Returns false when it was already detached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return false;
        };
        self.nodes[parent.0].children.retain(|c| *c != id);
        true
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Insert `node` as the previous sibling of `reference`.
    /// Does nothing when `reference` has no parent.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) {
        let Some(parent) = self.parent(reference) else {
            return;
        };
        self.detach(node);
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|c| *c == reference)
            .unwrap_or(0);
        self.nodes[node.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos, node);
    }

    /// Put `replacement` where `old` was; `old` ends up detached
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) {
        if self.parent(old).is_none() {
            return;
        }
        self.insert_before(old, replacement);
        self.detach(old);
    }

    /// Put `wrapper` where `target` was and move `target` inside it
    pub fn wrap(&mut self, target: NodeId, wrapper: NodeId) {
        self.insert_before(target, wrapper);
        self.append_child(wrapper, target);
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Move every child of `from` to the end of `to`
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.0].children);
        for child in children {
            self.nodes[child.0].parent = Some(to);
            self.nodes[to.0].children.push(child);
        }
    }

    /// Replace the children of `id` with a single text node
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        self.clear_children(id);
        let node = self.create_text(text);
        self.append_child(id, node);
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(existing) = &mut self.nodes[id.0].kind {
            *existing = text.into();
        }
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

/// Phrasing elements that do not break words apart
fn is_inline(tag: &str) -> bool {
    matches!(
        tag,
        "a" | "abbr" | "b" | "bdi" | "bdo" | "cite" | "code" | "data" | "del" | "dfn" | "em"
            | "i" | "ins" | "kbd" | "mark" | "q" | "s" | "samp" | "small" | "span" | "strong"
            | "sub" | "sup" | "time" | "u" | "var"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_serialize() {
        let mut dom = Dom::new();
        let root = dom.root();
        let p = dom.create_element(Element::new("p").with_attr("class", "lead"));
        let text = dom.create_text("a < b");
        dom.append_child(p, text);
        dom.append_child(root, p);
        assert_eq!(dom.to_html(), r#"<p class="lead">a &lt; b</p>"#);
    }

    #[test]
    fn test_wrap_and_replace() {
        let mut dom = Dom::parse_fragment("<table><tr><td>1</td></tr></table><p>x</p>");
        let table = dom.select(&Selector::tag("table"))[0];
        let wrapper = dom.create_element(Element::new("div").with_attr("class", "w"));
        dom.wrap(table, wrapper);
        assert_eq!(dom.parent(table), Some(wrapper));
        assert!(dom.to_html().starts_with(r#"<div class="w"><table>"#));

        let p = dom.select(&Selector::tag("p"))[0];
        let span = dom.create_element_with_text(Element::new("span"), "y");
        dom.replace(p, span);
        assert!(!dom.is_attached(p));
        assert!(dom.to_html().ends_with("<span>y</span>"));
    }

    #[test]
    fn test_detach_is_idempotent() {
        let mut dom = Dom::parse_fragment("<div><span>a</span></div>");
        let span = dom.select(&Selector::tag("span"))[0];
        assert!(dom.detach(span));
        assert!(!dom.detach(span));
        assert!(!dom.is_attached(span));
        assert_eq!(dom.to_html(), "<div></div>");
    }

    #[test]
    fn test_select_skips_detached_nodes() {
        let mut dom = Dom::parse_fragment("<p class=\"a\">1</p><p class=\"a\">2</p>");
        let first = dom.select(&Selector::tag("p").class("a"))[0];
        dom.detach(first);
        let remaining = dom.select(&Selector::tag("p").class("a"));
        assert_eq!(remaining.len(), 1);
        assert_eq!(dom.text_content(remaining[0]), "2");
    }

    #[test]
    fn test_add_class_deduplicates() {
        let mut el = Element::new("img");
        el.add_class("floating-image");
        el.add_class("floating-image");
        assert_eq!(el.attr("class"), Some("floating-image"));
    }

    #[test]
    fn test_visible_text_separates_blocks() {
        let dom = Dom::parse_fragment(
            "<h1>Intro</h1><p>Hello <em>wor</em>ld.</p><ul><li>one</li><li>two</li></ul>",
        );
        assert_eq!(dom.visible_text(dom.root()), "Intro Hello world. one two");
        assert_eq!(dom.text_content(dom.root()), "IntroHello world.onetwo");
    }

    #[test]
    fn test_visible_text_breaks_and_cells() {
        let dom = Dom::parse_fragment("<p>a<br>b</p><table><tr><td>c</td><td>d</td></tr></table>");
        assert_eq!(dom.visible_text(dom.root()), "a b c d");
    }
}
