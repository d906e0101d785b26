//! HTML serialization for [`Dom`] trees.

use super::{Dom, NodeId, NodeKind};
use std::borrow::Cow;

/// Elements that never have children or a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Escape text content
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape_with(s, &['<', '>', '&'])
}

/// Escape an attribute value
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape_with(s, &['<', '>', '&', '"', '\''])
}

fn escape_with<'a>(s: &'a str, chars: &[char]) -> Cow<'a, str> {
    if !s.contains(chars) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        if !chars.contains(&c) {
            out.push(c);
            continue;
        }
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

impl Dom {
    /// Serialize the whole tree (the root's children)
    pub fn to_html(&self) -> String {
        self.inner_html(self.root())
    }

    /// Serialize the children of `id`
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.write_node(*child, &mut out);
        }
        out
    }

    /// Serialize `id` itself, including its own tag
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Root => {
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Raw(markup) => out.push_str(markup),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for (name, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if is_void_element(&el.tag) {
                    return;
                }
                for child in self.children(id) {
                    self.write_node(*child, out);
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("plain"), "plain");
        assert_eq!(escape_text("<b> & \"q\""), "&lt;b&gt; &amp; \"q\"");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr(r#"a"b'c"#), "a&quot;b&#39;c");
    }

    #[test]
    fn test_void_elements_have_no_closing_tag() {
        let mut dom = Dom::new();
        let root = dom.root();
        let img = dom.create_element(Element::new("img").with_attr("src", "/a.jpg"));
        dom.append_child(root, img);
        assert_eq!(dom.to_html(), r#"<img src="/a.jpg">"#);
    }

    #[test]
    fn test_raw_nodes_are_verbatim() {
        let mut dom = Dom::new();
        let root = dom.root();
        let raw = dom.create_raw("<span class=\"k\">fn</span>");
        dom.append_child(root, raw);
        assert_eq!(dom.to_html(), "<span class=\"k\">fn</span>");
    }
}
