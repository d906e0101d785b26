//! Markdown processing pipeline.
//!
//! A document body is parsed into a [`Dom`], given heading ids, rewritten by
//! the [`Pipeline`] stages, serialized, and passed through the article
//! sanitizer.

pub mod alerts;
pub mod code_blocks;
pub mod convert;
pub mod floating_images;
pub mod highlight;
pub mod images;
pub mod pipeline;
pub mod tables;

use crate::sanitize::Policy;
use crate::slug::SlugAllocator;
use quire_types::dom::{Dom, NodeId};
use quire_types::TocEntry;

pub use pipeline::{Pipeline, Stage, TransformContext, TransformOptions};

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Output of one document run
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    /// Sanitized markup
    pub html: String,
    pub toc: Vec<TocEntry>,
    /// Text of the first top-level paragraph, taken before any rewrite
    pub lead: Option<String>,
    /// Visible text of the sanitized markup, for reading time
    pub text: String,
}

/// Markdown processor with the standard stages and the article policy
pub struct MarkdownProcessor {
    pipeline: Pipeline,
    policy: Policy,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        Self {
            pipeline: Pipeline::standard(),
            policy: Policy::article(),
        }
    }

    pub fn render(&self, markdown: &str, options: &TransformOptions) -> RenderedDocument {
        let mut dom = convert::markdown_to_dom(markdown);
        let toc = attach_heading_ids(&mut dom);
        let lead = lead_paragraph(&dom);

        let mut ctx = TransformContext::new(options.clone());
        self.pipeline.run(&mut dom, &mut ctx);

        let html = self.policy.clean(&dom.to_html());
        let sanitized = Dom::parse_fragment(&html);
        let text = sanitized.visible_text(sanitized.root());

        RenderedDocument {
            html,
            toc,
            lead,
            text,
        }
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn headings(dom: &Dom) -> Vec<NodeId> {
    dom.descendants(dom.root())
        .into_iter()
        .filter(|id| dom.tag(*id).is_some_and(|t| HEADING_TAGS.contains(&t)))
        .collect()
}

/// Give every heading an id and collect the table of contents.
///
/// Explicit `{#id}` attributes win; the rest are slugs of the heading text,
/// de-duplicated within the document.
fn attach_heading_ids(dom: &mut Dom) -> Vec<TocEntry> {
    let headings = headings(dom);
    let mut slugs = SlugAllocator::new();
    for heading in &headings {
        if let Some(id) = dom.attr(*heading, "id") {
            slugs.reserve(id);
        }
    }

    let mut toc = Vec::with_capacity(headings.len());
    for heading in headings {
        let text = dom.text_content(heading).trim().to_string();
        let id = match dom.attr(heading, "id") {
            Some(id) => id.to_string(),
            None => {
                let id = slugs.allocate(&text);
                dom.set_attr(heading, "id", id.clone());
                id
            }
        };
        let level = dom
            .tag(heading)
            .and_then(|t| t[1..].parse::<u8>().ok())
            .unwrap_or(1);
        toc.push(TocEntry::new(id, text, level));
    }
    toc
}

fn lead_paragraph(dom: &Dom) -> Option<String> {
    dom.children(dom.root())
        .iter()
        .filter(|id| dom.is_tag(**id, "p"))
        .map(|id| dom.text_content(*id).trim().to_string())
        .find(|text| !text.is_empty())
}

/// Convenience for tests and callers without a config
pub fn render_default(markdown: &str) -> RenderedDocument {
    MarkdownProcessor::new().render(markdown, &TransformOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_types::Selector;

    fn count_matches(html: &str, selector: &Selector) -> usize {
        Dom::parse_fragment(html).select(selector).len()
    }

    #[test]
    fn test_basic_markdown() {
        let doc = render_default("# Hello World\n\nThis is a **test**.");
        assert_eq!(
            doc.html,
            "<h1 id=\"hello-world\">Hello World</h1><p>This is a <strong>test</strong>.</p>"
        );
        assert_eq!(doc.lead.as_deref(), Some("This is a test."));
    }

    #[test]
    fn test_toc_ids_deduplicated() {
        let doc = render_default("## Setup\n\n## Setup\n\n### Custom {#mine}\n");
        let ids: Vec<_> = doc.toc.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["setup", "setup-1", "mine"]);
        assert_eq!(doc.toc[2].level, 3);
        assert!(doc.html.contains("<h2 id=\"setup-1\">"));
    }

    #[test]
    fn test_full_pipeline() {
        let md = r#"Intro paragraph.

> [!TIP]
> Use it

```rust
fn main() {}
```

| A |
|---|
| 1 |

<script>alert(1)</script>
"#;
        let doc = render_default(md);
        assert_eq!(count_matches(&doc.html, &Selector::tag("div").class("alert-tip")), 1);
        assert_eq!(count_matches(&doc.html, &Selector::tag("div").class("code-block")), 1);
        assert_eq!(count_matches(&doc.html, &Selector::tag("div").class("table-scroll")), 1);
        assert!(!doc.html.contains("<script"));
        assert!(doc.text.contains("Intro paragraph."));
    }

    #[test]
    fn test_text_keeps_block_boundaries() {
        let doc = render_default("# Intro\n\nHello world.\n\nNext para\n\n- one\n- two\n");
        assert_eq!(doc.text, "Intro Hello world. Next para one two");
        assert_eq!(crate::metadata::word_count(&doc.text), 7);
    }

    #[test]
    fn test_event_handlers_never_survive() {
        let doc = render_default("<img src=\"/public/a.png\" onerror=\"x()\" style=\"float:left\">\n");
        assert!(!doc.html.contains("onerror"));
        assert!(doc.html.contains("class=\"floating-image\""));
        // Raw tags become elements after image paths are normalized
        assert!(doc.html.contains("src=\"/public/a.png\""));
    }
}
