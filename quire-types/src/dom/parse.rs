//! HTML fragment parsing via `scraper` (html5ever).

use super::{Dom, Element, NodeId};
use scraper::{Html, Node};
use std::collections::HashMap;

impl Dom {
    /// Parse `html` as a body fragment and append the resulting nodes to `parent`.
    ///
    /// Comments, doctypes and processing instructions are dropped. Returns the
    /// ids of the top-level nodes that were appended.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Vec<NodeId> {
        let nodes = self.parse_detached(html);
        for node in &nodes {
            self.append_child(parent, *node);
        }
        nodes
    }

    /// Parse `html` into detached top-level nodes owned by this tree
    pub fn parse_detached(&mut self, html: &str) -> Vec<NodeId> {
        let fragment = Html::parse_fragment(html);
        let container = fragment.root_element();

        let mut created = HashMap::new();
        let mut top_level = Vec::new();

        for node in container.descendants().skip(1) {
            let id = match node.value() {
                Node::Element(el) => {
                    let attrs = el
                        .attrs()
                        .map(|(name, value)| (name.to_string(), value.to_string()))
                        .collect();
                    self.create_element(Element {
                        tag: el.name().to_string(),
                        attrs,
                    })
                }
                Node::Text(text) => self.create_text(String::from(&**text)),
                _ => continue,
            };

            match node.parent().and_then(|p| created.get(&p.id()).copied()) {
                Some(parent_id) => self.append_child(parent_id, id),
                None => top_level.push(id),
            }
            created.insert(node.id(), id);
        }

        top_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{NodeKind, Selector};

    #[test]
    fn test_parse_nested_elements() {
        let dom = Dom::parse_fragment(r#"<div class="x"><p>Hello <em>world</em></p></div>"#);
        let root_children = dom.children(dom.root());
        assert_eq!(root_children.len(), 1);
        let div = root_children[0];
        assert_eq!(dom.attr(div, "class"), Some("x"));
        assert_eq!(dom.text_content(div), "Hello world");
    }

    #[test]
    fn test_parse_drops_comments() {
        let dom = Dom::parse_fragment("<p>a<!-- hidden -->b</p>");
        assert_eq!(dom.to_html(), "<p>ab</p>");
    }

    #[test]
    fn test_parse_keeps_svg_case() {
        let dom = Dom::parse_fragment(
            r#"<svg viewBox="0 0 10 10"><foreignObject><div>x</div></foreignObject></svg>"#,
        );
        let svg = dom.select(&Selector::tag("svg"))[0];
        assert_eq!(dom.attr(svg, "viewBox"), Some("0 0 10 10"));
        assert_eq!(dom.select(&Selector::tag("foreignObject")).len(), 1);
    }

    #[test]
    fn test_parse_detached_nodes_are_not_attached() {
        let mut dom = Dom::new();
        let nodes = dom.parse_detached("<span>a</span>text");
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| !dom.is_attached(*n)));
        assert!(matches!(dom.kind(nodes[1]), NodeKind::Text(t) if t == "text"));
    }
}
