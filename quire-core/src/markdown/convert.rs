//! Markdown to [`Dom`] conversion using pulldown-cmark.

use pulldown_cmark::{Alignment, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use quire_types::dom::{Dom, Element, NodeId, NodeKind};

/// Language recorded on fenced blocks that do not name one
pub const PLAIN_LANGUAGE: &str = "text";

/// The extensions every document is parsed with
pub fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

/// Parse `markdown` and build a tree from its events
pub fn markdown_to_dom(markdown: &str) -> Dom {
    let parser = Parser::new_ext(markdown, parser_options());
    let mut converter = MarkdownConverter::new();
    for event in parser {
        converter.handle_event(event);
    }
    converter.dom
}

/// Table state while its rows are being emitted
struct TableFrame {
    table: NodeId,
    body: Option<NodeId>,
    alignments: Vec<Alignment>,
    in_head: bool,
    cell: usize,
}

struct MarkdownConverter {
    dom: Dom,
    /// Open elements. `None` marks a tag that produces no element of its own.
    stack: Vec<Option<NodeId>>,
    tables: Vec<TableFrame>,
    /// Lines of the HTML block currently being read
    html_block: Option<String>,
}

impl MarkdownConverter {
    fn new() -> Self {
        Self {
            dom: Dom::new(),
            stack: Vec::new(),
            tables: Vec::new(),
            html_block: None,
        }
    }

    fn current(&self) -> NodeId {
        self.stack
            .iter()
            .rev()
            .find_map(|frame| *frame)
            .unwrap_or_else(|| self.dom.root())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.add_text(text.as_ref()),
            Event::Code(code) => {
                let el = self
                    .dom
                    .create_element_with_text(Element::new("code"), code.as_ref());
                self.add_node(el);
            }
            Event::Html(html) => match self.html_block.as_mut() {
                Some(block) => block.push_str(html.as_ref()),
                None => self.add_raw(html.as_ref()),
            },
            Event::InlineHtml(html) => self.add_raw(html.as_ref()),
            Event::SoftBreak => self.add_text("\n"),
            Event::HardBreak => self.add_element(Element::new("br")),
            Event::Rule => self.add_element(Element::new("hr")),
            Event::FootnoteReference(name) => self.add_footnote_ref(name.as_ref()),
            Event::TaskListMarker(checked) => {
                let mut input = Element::new("input")
                    .with_attr("type", "checkbox")
                    .with_attr("disabled", "");
                if checked {
                    input.set_attr("checked", "");
                }
                self.add_element(input);
            }
            // Math parsing is not enabled; keep the source visible
            Event::InlineMath(math) | Event::DisplayMath(math) => self.add_text(math.as_ref()),
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::HtmlBlock => {
                self.html_block = Some(String::new());
                self.stack.push(None);
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => code_language(info.as_ref()),
                    CodeBlockKind::Indented => PLAIN_LANGUAGE.to_string(),
                };
                let pre = self
                    .dom
                    .create_element(Element::new("pre").with_attr("data-language", &language));
                let code = self.dom.create_element(
                    Element::new("code").with_attr("class", format!("language-{}", language)),
                );
                self.dom.append_child(pre, code);
                self.add_node(pre);
                self.stack.push(Some(code));
            }
            Tag::Table(alignments) => {
                let table = self.dom.create_element(Element::new("table"));
                self.add_node(table);
                self.tables.push(TableFrame {
                    table,
                    body: None,
                    alignments,
                    in_head: false,
                    cell: 0,
                });
                self.stack.push(Some(table));
            }
            Tag::TableHead => {
                let thead = self.dom.create_element(Element::new("thead"));
                let row = self.dom.create_element(Element::new("tr"));
                self.dom.append_child(thead, row);
                self.add_node(thead);
                if let Some(frame) = self.tables.last_mut() {
                    frame.in_head = true;
                    frame.cell = 0;
                }
                self.stack.push(Some(row));
            }
            Tag::TableRow => {
                let row = self.dom.create_element(Element::new("tr"));
                let fallback = self.current();
                let parent = match self.tables.last_mut() {
                    Some(frame) => {
                        frame.cell = 0;
                        match frame.body {
                            Some(body) => body,
                            None => {
                                let body = self.dom.create_element(Element::new("tbody"));
                                self.dom.append_child(frame.table, body);
                                frame.body = Some(body);
                                body
                            }
                        }
                    }
                    None => fallback,
                };
                self.dom.append_child(parent, row);
                self.stack.push(Some(row));
            }
            Tag::TableCell => {
                let (name, alignment) = match self.tables.last_mut() {
                    Some(frame) => {
                        let alignment = frame.alignments.get(frame.cell).copied();
                        frame.cell += 1;
                        (if frame.in_head { "th" } else { "td" }, alignment)
                    }
                    None => ("td", None),
                };
                let mut cell = Element::new(name);
                if let Some(align) = alignment.and_then(alignment_attr) {
                    cell.set_attr("align", align);
                }
                self.push_element(cell);
            }
            Tag::FootnoteDefinition(label) => {
                let def = Element::new("div")
                    .with_attr("class", "footnote")
                    .with_attr("id", format!("fn-{}", label));
                let id = self.push_element(def);
                let marker = self.dom.create_element_with_text(
                    Element::new("sup").with_attr("class", "footnote-label"),
                    label.as_ref(),
                );
                self.dom.append_child(id, marker);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut img = Element::new("img").with_attr("src", dest_url.as_ref());
                if !title.is_empty() {
                    img.set_attr("title", title.as_ref());
                }
                self.push_element(img);
            }
            Tag::MetadataBlock(_) => self.stack.push(None),
            other => {
                let el = tag_to_element(&other);
                self.push_element(el);
            }
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        let frame = self.stack.pop().flatten();
        match tag {
            TagEnd::HtmlBlock => {
                if let Some(block) = self.html_block.take() {
                    self.add_raw(&block);
                }
            }
            TagEnd::Image => {
                if let Some(img) = frame {
                    let alt = self.dom.text_content(img);
                    self.dom.clear_children(img);
                    self.dom.set_attr(img, "alt", alt);
                }
            }
            TagEnd::Table => {
                self.tables.pop();
            }
            TagEnd::TableHead => {
                if let Some(table) = self.tables.last_mut() {
                    table.in_head = false;
                }
            }
            _ => {}
        }
    }

    fn push_element(&mut self, element: Element) -> NodeId {
        let id = self.dom.create_element(element);
        self.add_node(id);
        self.stack.push(Some(id));
        id
    }

    fn add_element(&mut self, element: Element) {
        let id = self.dom.create_element(element);
        self.add_node(id);
    }

    /// Append text, merging with a preceding text node.
    ///
    /// pulldown-cmark splits runs like `[!TIP]` across several events; merging
    /// keeps the authored text in one node.
    fn add_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(last) = self.dom.children(parent).last().copied() {
            if let NodeKind::Text(existing) = self.dom.kind_mut(last) {
                existing.push_str(text);
                return;
            }
        }
        let node = self.dom.create_text(text);
        self.dom.append_child(parent, node);
    }

    fn add_raw(&mut self, html: &str) {
        if html.trim().is_empty() {
            return;
        }
        let node = self.dom.create_raw(html);
        self.add_node(node);
    }

    fn add_footnote_ref(&mut self, name: &str) {
        let sup = self.dom.create_element(
            Element::new("sup")
                .with_attr("class", "footnote-ref")
                .with_attr("id", format!("fnref-{}", name)),
        );
        let link = self.dom.create_element_with_text(
            Element::new("a").with_attr("href", format!("#fn-{}", name)),
            name,
        );
        self.dom.append_child(sup, link);
        self.add_node(sup);
    }

    fn add_node(&mut self, node: NodeId) {
        let parent = self.current();
        self.dom.append_child(parent, node);
    }
}

/// First token of a fence info string, lowercased (`Rust,ignore` → `rust`)
pub fn code_language(info: &str) -> String {
    info.split(|c: char| c.is_whitespace() || c == ',' || c == '{')
        .find(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
        .unwrap_or_else(|| PLAIN_LANGUAGE.to_string())
}

fn alignment_attr(alignment: Alignment) -> Option<&'static str> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some("left"),
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    }
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// Element for tags without special handling in [`MarkdownConverter::start_tag`]
fn tag_to_element(tag: &Tag) -> Element {
    match tag {
        Tag::Paragraph => Element::new("p"),
        Tag::Heading { level, id, .. } => {
            let mut el = Element::new(heading_tag(*level));
            if let Some(id) = id {
                el.set_attr("id", id.as_ref());
            }
            el
        }
        Tag::BlockQuote(_) => Element::new("blockquote"),
        Tag::List(Some(start)) => {
            let mut el = Element::new("ol");
            if *start != 1 {
                el.set_attr("start", start.to_string());
            }
            el
        }
        Tag::List(None) => Element::new("ul"),
        Tag::Item => Element::new("li"),
        Tag::DefinitionList => Element::new("dl"),
        Tag::DefinitionListTitle => Element::new("dt"),
        Tag::DefinitionListDefinition => Element::new("dd"),
        Tag::Emphasis => Element::new("em"),
        Tag::Strong => Element::new("strong"),
        Tag::Strikethrough => Element::new("del"),
        Tag::Superscript => Element::new("sup"),
        Tag::Subscript => Element::new("sub"),
        Tag::Link {
            dest_url, title, ..
        } => {
            let mut el = Element::new("a").with_attr("href", dest_url.as_ref());
            if !title.is_empty() {
                el.set_attr("title", title.as_ref());
            }
            el
        }
        // Handled by the converter before reaching here
        Tag::HtmlBlock
        | Tag::CodeBlock(_)
        | Tag::Table(_)
        | Tag::TableHead
        | Tag::TableRow
        | Tag::TableCell
        | Tag::FootnoteDefinition(_)
        | Tag::Image { .. }
        | Tag::MetadataBlock(_) => Element::new("div"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_types::Selector;

    #[test]
    fn test_basic_markdown() {
        let dom = markdown_to_dom("# Hello World\n\nThis is a **test**.");
        assert_eq!(
            dom.to_html(),
            "<h1>Hello World</h1><p>This is a <strong>test</strong>.</p>"
        );
    }

    #[test]
    fn test_fenced_code_records_language() {
        let dom = markdown_to_dom("```Rust ignore\nfn main() {}\n```");
        assert_eq!(
            dom.to_html(),
            "<pre data-language=\"rust\"><code class=\"language-rust\">fn main() {}\n</code></pre>"
        );
    }

    #[test]
    fn test_fence_without_language_is_text() {
        let dom = markdown_to_dom("```\nplain\n```");
        let pre = dom.select(&Selector::tag("pre"))[0];
        assert_eq!(dom.attr(pre, "data-language"), Some("text"));
    }

    #[test]
    fn test_tables() {
        let md = "| A | B |\n|:--|--:|\n| 1 | 2 |\n| 3 | 4 |\n";
        let dom = markdown_to_dom(md);
        assert_eq!(dom.select(&Selector::tag("thead")).len(), 1);
        assert_eq!(dom.select(&Selector::tag("tbody")).len(), 1);
        assert_eq!(dom.select(&Selector::tag("th")).len(), 2);
        assert_eq!(dom.select(&Selector::tag("td")).len(), 4);
        let first_th = dom.select(&Selector::tag("th"))[0];
        assert_eq!(dom.attr(first_th, "align"), Some("left"));
        let last_td = dom.select(&Selector::tag("td"))[3];
        assert_eq!(dom.attr(last_td, "align"), Some("right"));
    }

    #[test]
    fn test_image_alt_from_text() {
        let dom = markdown_to_dom("![A *nice* view](/public/a.png \"Title\")");
        let img = dom.select(&Selector::tag("img"))[0];
        assert_eq!(dom.attr(img, "alt"), Some("A nice view"));
        assert_eq!(dom.attr(img, "src"), Some("/public/a.png"));
        assert_eq!(dom.attr(img, "title"), Some("Title"));
        assert!(dom.children(img).is_empty());
    }

    #[test]
    fn test_alert_marker_text_is_merged() {
        let dom = markdown_to_dom("> [!TIP]\n> Use it");
        let p = dom.select(&Selector::tag("p"))[0];
        let first = dom.first_child(p).unwrap();
        assert!(dom.text(first).unwrap().starts_with("[!TIP]"));
    }

    #[test]
    fn test_html_block_is_one_raw_node() {
        let dom = markdown_to_dom("<img src=\"/a.png\" style=\"float: left\">\n\nText");
        let first = dom.first_child(dom.root()).unwrap();
        assert!(matches!(dom.kind(first), NodeKind::Raw(html) if html.starts_with("<img")));
    }

    #[test]
    fn test_footnotes_and_tasks() {
        let dom = markdown_to_dom("- [x] done\n\nSee[^1].\n\n[^1]: Note.");
        assert_eq!(dom.select(&Selector::tag("input").attr("checked")).len(), 1);
        assert_eq!(dom.select(&Selector::tag("sup").class("footnote-ref")).len(), 1);
        assert_eq!(dom.select(&Selector::tag("div").class("footnote")).len(), 1);
    }

    #[test]
    fn test_code_language() {
        assert_eq!(code_language("rust,ignore"), "rust");
        assert_eq!(code_language("  "), "text");
        assert_eq!(code_language("Mermaid"), "mermaid");
    }
}
