//! Copy-to-clipboard buttons on highlighted code blocks.

use crate::error::{ClipboardError, RuntimeError};
use crate::labels::{self, Labels};
use crate::overlay::{Injector, View};
use quire_types::dom::Element;
use quire_types::{Dom, NodeId, Selector};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const SCROLL_CLASS: &str = "code-scroll";
pub const BUTTON_CLASS: &str = "copy-button";

/// Host clipboard access
pub trait Clipboard: Send + Sync {
    /// Asynchronous clipboard API, when the host has one
    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    /// Select a hidden text area and issue a copy command
    fn copy_via_selection(&self, text: &str) -> Result<(), ClipboardError>;
}

pub struct CopyButtonInjector {
    labels: Arc<dyn Labels>,
    diagram_language: String,
}

impl CopyButtonInjector {
    pub fn new(labels: Arc<dyn Labels>, diagram_language: impl Into<String>) -> Self {
        Self {
            labels,
            diagram_language: diagram_language.into(),
        }
    }

    /// The highlighted block inside a wrapper, unless it is a diagram
    fn code_pre(&self, dom: &Dom, wrapper: NodeId) -> Option<NodeId> {
        let pre = dom.select_first_within(wrapper, &Selector::tag("pre").attr("data-language"))?;
        let is_diagram = dom.attr(pre, "data-diagram") == Some("true")
            || dom
                .attr(pre, "data-language")
                .is_some_and(|lang| lang.eq_ignore_ascii_case(&self.diagram_language));
        (!is_diagram).then_some(pre)
    }
}

impl Injector for CopyButtonInjector {
    type View = CopyButtonView;

    fn name(&self) -> &'static str {
        "copy-buttons"
    }

    fn targets(&self, dom: &Dom) -> Vec<NodeId> {
        dom.select(&Selector::tag("div").class("code-block"))
            .into_iter()
            .filter(|wrapper| self.code_pre(dom, *wrapper).is_some())
            .collect()
    }

    fn inject(&mut self, dom: &mut Dom, wrapper: NodeId) -> Option<CopyButtonView> {
        let pre = self.code_pre(dom, wrapper)?;
        if dom
            .select_first_within(wrapper, &Selector::tag("button").class(BUTTON_CLASS))
            .is_some()
        {
            return None;
        }

        let existing = dom
            .element_children(pre)
            .into_iter()
            .find(|child| dom.is_tag(*child, "div") && dom.has_class(*child, SCROLL_CLASS));
        let (scroll, created_scroll) = match existing {
            Some(scroll) => (scroll, false),
            None => {
                let scroll =
                    dom.create_element(Element::new("div").with_attr("class", SCROLL_CLASS));
                dom.move_children(pre, scroll);
                dom.append_child(pre, scroll);
                (scroll, true)
            }
        };

        let text = dom.text_content(scroll);
        let idle_label = self.labels.label(labels::COPY);
        let button = dom.create_element_with_text(
            Element::new("button")
                .with_attr("class", BUTTON_CLASS)
                .with_attr("type", "button")
                .with_attr("aria-label", self.labels.label(labels::COPY_ARIA))
                .with_attr("data-state", "idle"),
            &idle_label,
        );
        dom.append_child(scroll, button);

        Some(CopyButtonView {
            pre,
            scroll,
            created_scroll,
            button,
            text,
            idle_label,
            copied_label: self.labels.label(labels::COPIED),
            reset_at: None,
            unmounted: false,
        })
    }
}

pub struct CopyButtonView {
    pre: NodeId,
    scroll: NodeId,
    created_scroll: bool,
    button: NodeId,
    text: String,
    idle_label: String,
    copied_label: String,
    reset_at: Option<Instant>,
    unmounted: bool,
}

impl CopyButtonView {
    pub fn button(&self) -> NodeId {
        self.button
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_showing_copied(&self) -> bool {
        self.reset_at.is_some()
    }

    /// Copy the block's text. Returns whether any clipboard path succeeded;
    /// failures only reach the debug log.
    pub fn activate(
        &mut self,
        dom: &mut Dom,
        clipboard: &dyn Clipboard,
        now: Instant,
        reset_after: Duration,
    ) -> bool {
        let copied = match clipboard.write_text(&self.text) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("Clipboard write failed ({}), falling back to selection", e);
                match clipboard.copy_via_selection(&self.text) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::debug!("Selection copy failed: {}", e);
                        false
                    }
                }
            }
        };

        if copied {
            dom.set_text_content(self.button, &self.copied_label);
            dom.set_attr(self.button, "data-state", "copied");
            self.reset_at = Some(now + reset_after);
        }
        copied
    }

    /// Restore the idle label once the copied label has been shown long enough
    pub fn reset_if_due(&mut self, dom: &mut Dom, now: Instant) -> bool {
        if !self.reset_at.is_some_and(|at| now >= at) {
            return false;
        }
        self.reset_at = None;
        dom.set_text_content(self.button, &self.idle_label);
        dom.set_attr(self.button, "data-state", "idle");
        true
    }
}

impl View for CopyButtonView {
    fn unmount(&mut self, dom: &mut Dom) -> Result<(), RuntimeError> {
        if self.unmounted {
            return Err(RuntimeError::AlreadyUnmounted);
        }
        self.unmounted = true;
        dom.detach(self.button);
        if self.created_scroll {
            dom.move_children(self.scroll, self.pre);
            dom.detach(self.scroll);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::EnglishLabels;
    use parking_lot::Mutex;

    const BLOCK: &str = r#"<div class="code-block" data-language="rust"><div class="code-block-label">RUST</div><pre data-language="rust"><code class="language-rust">fn main() {}</code></pre></div>"#;

    fn injector() -> CopyButtonInjector {
        CopyButtonInjector::new(Arc::new(EnglishLabels), "mermaid")
    }

    #[derive(Default)]
    struct FakeClipboard {
        api_available: bool,
        selection_available: bool,
        copied: Mutex<Vec<(&'static str, String)>>,
    }

    impl Clipboard for FakeClipboard {
        fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
            if !self.api_available {
                return Err(ClipboardError::Unavailable);
            }
            self.copied.lock().push(("api", text.to_string()));
            Ok(())
        }

        fn copy_via_selection(&self, text: &str) -> Result<(), ClipboardError> {
            if !self.selection_available {
                return Err(ClipboardError::Rejected("no selection".into()));
            }
            self.copied.lock().push(("selection", text.to_string()));
            Ok(())
        }
    }

    #[test]
    fn test_wraps_content_and_mounts_button() {
        let mut dom = Dom::parse_fragment(BLOCK);
        let wrapper = injector().targets(&dom)[0];
        let view = injector().inject(&mut dom, wrapper).unwrap();
        assert_eq!(view.text(), "fn main() {}");

        let scroll = dom.select(&Selector::tag("div").class(SCROLL_CLASS))[0];
        assert!(dom.is_tag(dom.parent(scroll).unwrap(), "pre"));
        assert_eq!(dom.parent(view.button()), Some(scroll));
        assert_eq!(dom.text_content(view.button()), "Copy");
    }

    #[test]
    fn test_diagram_blocks_excluded() {
        let dom = Dom::parse_fragment(
            r#"<div class="code-block"><pre data-language="mermaid" data-diagram="true"><code>graph TD</code></pre></div>"#,
        );
        assert!(injector().targets(&dom).is_empty());
    }

    #[test]
    fn test_existing_scroll_container_reused() {
        let mut dom = Dom::parse_fragment(
            r#"<div class="code-block"><pre data-language="sh"><div class="code-scroll"><code>ls</code></div></pre></div>"#,
        );
        let wrapper = injector().targets(&dom)[0];
        let mut view = injector().inject(&mut dom, wrapper).unwrap();
        assert_eq!(dom.select(&Selector::tag("div").class(SCROLL_CLASS)).len(), 1);

        view.unmount(&mut dom).unwrap();
        assert_eq!(dom.select(&Selector::tag("div").class(SCROLL_CLASS)).len(), 1);
        assert!(dom.select(&Selector::tag("button")).is_empty());
    }

    #[test]
    fn test_unmount_restores_markup() {
        let mut dom = Dom::parse_fragment(BLOCK);
        let wrapper = injector().targets(&dom)[0];
        let mut view = injector().inject(&mut dom, wrapper).unwrap();
        view.unmount(&mut dom).unwrap();
        assert_eq!(dom.to_html(), BLOCK);
    }

    #[test]
    fn test_copy_prefers_clipboard_api() {
        let mut dom = Dom::parse_fragment(BLOCK);
        let wrapper = injector().targets(&dom)[0];
        let mut view = injector().inject(&mut dom, wrapper).unwrap();
        let clipboard = FakeClipboard {
            api_available: true,
            selection_available: true,
            ..Default::default()
        };

        let now = Instant::now();
        assert!(view.activate(&mut dom, &clipboard, now, Duration::from_secs(2)));
        assert_eq!(clipboard.copied.lock()[0].0, "api");
        assert_eq!(dom.text_content(view.button()), "Copied!");
    }

    #[test]
    fn test_copy_falls_back_to_selection() {
        let mut dom = Dom::parse_fragment(BLOCK);
        let wrapper = injector().targets(&dom)[0];
        let mut view = injector().inject(&mut dom, wrapper).unwrap();
        let clipboard = FakeClipboard {
            api_available: false,
            selection_available: true,
            ..Default::default()
        };

        assert!(view.activate(&mut dom, &clipboard, Instant::now(), Duration::from_secs(2)));
        assert_eq!(
            clipboard.copied.lock().as_slice(),
            &[("selection", "fn main() {}".to_string())]
        );
    }

    #[test]
    fn test_copy_failure_is_silent() {
        let mut dom = Dom::parse_fragment(BLOCK);
        let wrapper = injector().targets(&dom)[0];
        let mut view = injector().inject(&mut dom, wrapper).unwrap();
        let clipboard = FakeClipboard::default();

        assert!(!view.activate(&mut dom, &clipboard, Instant::now(), Duration::from_secs(2)));
        assert_eq!(dom.text_content(view.button()), "Copy");
        assert!(!view.is_showing_copied());
    }

    #[test]
    fn test_copied_label_resets() {
        let mut dom = Dom::parse_fragment(BLOCK);
        let wrapper = injector().targets(&dom)[0];
        let mut view = injector().inject(&mut dom, wrapper).unwrap();
        let clipboard = FakeClipboard {
            api_available: true,
            ..Default::default()
        };
        let start = Instant::now();
        view.activate(&mut dom, &clipboard, start, Duration::from_secs(2));

        assert!(!view.reset_if_due(&mut dom, start + Duration::from_secs(1)));
        assert!(view.reset_if_due(&mut dom, start + Duration::from_secs(2)));
        assert_eq!(dom.text_content(view.button()), "Copy");
        assert_eq!(dom.attr(view.button(), "data-state"), Some("idle"));
    }
}
