//! Raw `<img>` tags written inline by authors.
//!
//! A lone `<img …>` in the markdown source arrives as raw markup. It is turned
//! into a real element so later stages and the sanitizer see it, and it gets
//! the `floating-image` class when its style floats it.

use super::pipeline::{Stage, TransformContext};
use quire_types::dom::{Dom, Element, NodeId, NodeKind};
use regex::Regex;
use std::sync::OnceLock;

static IMG_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn img_tag_regex() -> &'static Regex {
    IMG_TAG_REGEX
        .get_or_init(|| Regex::new(r"(?is)^\s*<img\b([^<>]*?)/?>\s*$").expect("static regex"))
}

pub const FLOATING_CLASS: &str = "floating-image";

pub struct FloatingImageStage;

impl Stage for FloatingImageStage {
    fn name(&self) -> &'static str {
        "floating-images"
    }

    fn apply(&self, dom: &mut Dom, ctx: &mut TransformContext) {
        let raw_nodes: Vec<NodeId> = dom
            .descendants(dom.root())
            .into_iter()
            .filter(|id| matches!(dom.kind(*id), NodeKind::Raw(_)))
            .collect();

        for raw in raw_nodes {
            if !ctx.mark_visited(self.name(), raw) {
                continue;
            }
            let NodeKind::Raw(markup) = dom.kind(raw) else {
                continue;
            };
            let Some(img) = image_from_markup(markup) else {
                continue;
            };
            let node = dom.create_element(img);
            dom.replace(raw, node);
        }
    }
}

/// Build an `img` element from a lone raw tag; `None` when it is not one or has no `src`
pub fn image_from_markup(markup: &str) -> Option<Element> {
    let captures = img_tag_regex().captures(markup)?;
    let attrs = parse_attributes(captures.get(1)?.as_str());
    let lookup = |name: &str| {
        attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    };

    let src = lookup("src").filter(|s| !s.trim().is_empty())?;
    let mut img = Element::new("img").with_attr("src", src);
    img.set_attr("alt", lookup("alt").unwrap_or(""));

    if let Some(style) = lookup("style").filter(|s| !s.trim().is_empty()) {
        img.set_attr("style", style);
        if declares_float(style) {
            img.add_class(FLOATING_CLASS);
        }
    }
    Some(img)
}

fn declares_float(style: &str) -> bool {
    style.split(';').any(|decl| {
        decl.split_once(':')
            .is_some_and(|(prop, _)| prop.trim().eq_ignore_ascii_case("float"))
    })
}

/// Parse an HTML attribute string into (lowercase name, value) pairs.
///
/// Accepts double-quoted, single-quoted and unquoted values, and bare names.
pub fn parse_attributes(s: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c.is_whitespace() || c == '/' {
            continue;
        }

        let mut name = String::from(c);
        while let Some(&next) = chars.peek() {
            if next == '=' || next.is_whitespace() {
                break;
            }
            name.push(next);
            chars.next();
        }

        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            match chars.peek().copied() {
                Some(quote @ ('"' | '\'')) => {
                    chars.next();
                    for next in chars.by_ref() {
                        if next == quote {
                            break;
                        }
                        value.push(next);
                    }
                }
                _ => {
                    while let Some(&next) = chars.peek() {
                        if next.is_whitespace() {
                            break;
                        }
                        value.push(next);
                        chars.next();
                    }
                }
            }
        }

        attrs.push((name.to_ascii_lowercase(), value));
    }

    attrs
}
