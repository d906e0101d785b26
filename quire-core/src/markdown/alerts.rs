//! GitHub-style alert blocks.
//!
//! A blockquote whose first text starts with `[!TYPE]` becomes
//!
//! ```html
//! <div class="alert alert-tip" data-alert-type="tip">
//!   <p class="alert-title" data-alert-icon="tip">Tip</p>
//!   <div class="alert-content">…</div>
//! </div>
//! ```

use super::pipeline::{Stage, TransformContext};
use quire_types::dom::{Dom, Element, NodeId, NodeKind, Selector};
use quire_types::AlertKind;
use regex::Regex;
use std::sync::OnceLock;

static MARKER_REGEX: OnceLock<Regex> = OnceLock::new();

fn marker_regex() -> &'static Regex {
    MARKER_REGEX.get_or_init(|| Regex::new(r"^\s*\[!([A-Za-z]+)\]\s*").expect("static regex"))
}

pub struct AlertStage;

impl Stage for AlertStage {
    fn name(&self) -> &'static str {
        "alerts"
    }

    fn apply(&self, dom: &mut Dom, ctx: &mut TransformContext) {
        for quote in dom.select(&Selector::tag("blockquote")) {
            if !ctx.mark_visited(self.name(), quote) {
                continue;
            }
            if let Some(alert) = rewrite_alert(dom, quote) {
                ctx.mark_visited(self.name(), alert);
            }
        }
    }
}

/// First text node under `quote`, skipping whitespace-only runs
fn first_text_run(dom: &Dom, quote: NodeId) -> Option<NodeId> {
    dom.descendants(quote).into_iter().find(|id| match dom.kind(*id) {
        NodeKind::Text(text) => !text.trim().is_empty(),
        _ => false,
    })
}

fn rewrite_alert(dom: &mut Dom, quote: NodeId) -> Option<NodeId> {
    let text_node = first_text_run(dom, quote)?;
    let text = dom.text(text_node)?;

    let captures = marker_regex().captures(text)?;
    let kind = AlertKind::from_marker(captures.get(1)?.as_str())?;
    let marker_end = captures.get(0)?.end();
    let remainder = text[marker_end..].to_string();

    if remainder.is_empty() {
        let container = dom.parent(text_node);
        dom.detach(text_node);
        if let Some(paragraph) = container.filter(|p| dom.is_tag(*p, "p")) {
            if dom.children(paragraph).is_empty() {
                dom.detach(paragraph);
            }
        }
    } else {
        dom.set_text(text_node, remainder);
    }

    let alert = dom.create_element(
        Element::new("div")
            .with_attr("class", format!("alert alert-{}", kind.as_str()))
            .with_attr("data-alert-type", kind.as_str()),
    );
    let title = dom.create_element_with_text(
        Element::new("p")
            .with_attr("class", "alert-title")
            .with_attr("data-alert-icon", kind.as_str()),
        kind.label(),
    );
    let content = dom.create_element(Element::new("div").with_attr("class", "alert-content"));

    dom.move_children(quote, content);
    dom.append_child(alert, title);
    dom.append_child(alert, content);
    dom.replace(quote, alert);

    Some(alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::convert::markdown_to_dom;

    fn run(markdown: &str) -> Dom {
        let mut dom = markdown_to_dom(markdown);
        let mut ctx = TransformContext::default();
        AlertStage.apply(&mut dom, &mut ctx);
        dom
    }

    #[test]
    fn test_tip_alert() {
        let dom = run("> [!TIP]\n> Use it");
        assert_eq!(
            dom.to_html(),
            r#"<div class="alert alert-tip" data-alert-type="tip"><p class="alert-title" data-alert-icon="tip">Tip</p><div class="alert-content"><p>Use it</p></div></div>"#
        );
    }

    #[test]
    fn test_marker_on_own_paragraph_removes_paragraph() {
        let dom = run("> [!warning]\n>\n> Careful.");
        let content = dom.select(&Selector::tag("div").class("alert-content"))[0];
        assert_eq!(dom.inner_html(content), "<p>Careful.</p>");
        assert_eq!(dom.select(&Selector::tag("div").class("alert-warning")).len(), 1);
    }

    #[test]
    fn test_unknown_marker_untouched() {
        let dom = run("> [!FOO]\n> x");
        assert_eq!(dom.select(&Selector::tag("blockquote")).len(), 1);
        assert!(dom.to_html().contains("[!FOO]"));
    }

    #[test]
    fn test_plain_blockquote_untouched() {
        let dom = run("> Just a quote");
        assert_eq!(dom.to_html(), "<blockquote><p>Just a quote</p></blockquote>");
    }

    #[test]
    fn test_second_pass_is_noop() {
        let mut dom = markdown_to_dom("> [!NOTE]\n> body");
        let mut ctx = TransformContext::default();
        AlertStage.apply(&mut dom, &mut ctx);
        let once = dom.to_html();
        AlertStage.apply(&mut dom, &mut ctx);
        assert_eq!(dom.to_html(), once);
    }
}
