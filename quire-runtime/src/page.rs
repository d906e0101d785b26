//! One enhanced page: shared tree, overlays, diagrams, scroll spy, event bus.

use crate::alert_icons::AlertIconInjector;
use crate::config::RuntimeConfig;
use crate::copy_buttons::{Clipboard, CopyButtonInjector};
use crate::diagrams::{DiagramEngine, DiagramRenderer, UnmountHandle};
use crate::events::{EventBus, PageEvent};
use crate::labels::{EnglishLabels, Labels};
use crate::overlay::Coordinator;
use crate::scroll_spy::ScrollSpy;
use crate::{shared, SharedDom};
use quire_types::dom::Element;
use quire_types::{ContentId, Dom, NodeId};
use std::sync::Arc;
use std::time::Instant;

/// Class of the document element; carries `dark` in dark mode
pub const DOCUMENT_CLASS: &str = "quire-page";
/// Class of the element holding the served article markup
pub const CONTENT_CLASS: &str = "quire-content";

/// What one tick changed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub alert_icons: usize,
    pub copy_buttons: usize,
    pub copy_resets: usize,
    pub diagrams: usize,
}

pub struct Page<E: DiagramEngine, C: Clipboard> {
    dom: SharedDom,
    document: NodeId,
    region: NodeId,
    content: ContentId,
    config: RuntimeConfig,
    bus: EventBus,
    alerts: Coordinator<AlertIconInjector>,
    copies: Coordinator<CopyButtonInjector>,
    diagrams: DiagramRenderer<E>,
    clipboard: C,
    spy: ScrollSpy,
}

impl<E: DiagramEngine, C: Clipboard> Page<E, C> {
    pub fn new(
        content: ContentId,
        markup: &str,
        engine: E,
        clipboard: C,
        config: RuntimeConfig,
        labels: Arc<dyn Labels>,
    ) -> Self {
        let mut dom = Dom::new();
        let document =
            dom.create_element(Element::new("div").with_attr("class", DOCUMENT_CLASS));
        let root = dom.root();
        dom.append_child(root, document);
        let region = dom.create_element(Element::new("article").with_attr("class", CONTENT_CLASS));
        dom.append_child(document, region);
        dom.append_html(region, markup);

        let settle = config.settle_delay();
        Self {
            dom: shared(dom),
            document,
            region,
            content,
            bus: EventBus::new(),
            alerts: Coordinator::new(AlertIconInjector, settle),
            copies: Coordinator::new(
                CopyButtonInjector::new(Arc::clone(&labels), config.diagram_language.clone()),
                settle,
            ),
            diagrams: DiagramRenderer::new(engine, labels, config.diagram_language.clone(), settle),
            clipboard,
            spy: ScrollSpy::new(&config),
            config,
        }
    }

    /// English labels and default settings
    pub fn with_defaults(content: ContentId, markup: &str, engine: E, clipboard: C) -> Self {
        Self::new(
            content,
            markup,
            engine,
            clipboard,
            RuntimeConfig::default(),
            Arc::new(EnglishLabels),
        )
    }

    pub fn dom(&self) -> &SharedDom {
        &self.dom
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn content(&self) -> &ContentId {
        &self.content
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn scroll_spy(&mut self) -> &mut ScrollSpy {
        &mut self.spy
    }

    pub fn diagrams(&self) -> &DiagramRenderer<E> {
        &self.diagrams
    }

    pub fn diagram_unmount_handle(&self) -> UnmountHandle {
        self.diagrams.unmount_handle()
    }

    /// Markup of the content region
    pub fn content_html(&self) -> String {
        self.dom.lock().inner_html(self.region)
    }

    pub fn mount(&mut self, now: Instant) {
        tracing::debug!("Mounting page {}", self.content);
        self.alerts.mount(now, self.content.clone());
        self.copies.mount(now, self.content.clone());
        self.diagrams.mount(now, self.content.clone());
    }

    /// Replace the content region with new markup under a new identity
    pub fn swap_content(&mut self, now: Instant, content: ContentId, markup: &str) {
        {
            let mut dom = self.dom.lock();
            dom.clear_children(self.region);
            dom.append_html(self.region, markup);
        }
        self.content = content;
        self.alerts.content_changed(now, self.content.clone());
        self.copies.content_changed(now, self.content.clone());
        self.diagrams.content_changed(now, self.content.clone());

        self.bus.publish(&PageEvent::ContentChanged {
            content: self.content.clone(),
        });
    }

    pub fn is_dark(&self) -> bool {
        self.dom.lock().has_class(self.document, "dark")
    }

    /// Flip the theme signal. Diagrams follow on the next tick.
    pub fn set_dark_theme(&mut self, dark: bool) {
        if self.is_dark() == dark {
            return;
        }
        {
            let mut dom = self.dom.lock();
            if dark {
                dom.add_class(self.document, "dark");
            } else {
                let classes = dom
                    .attr(self.document, "class")
                    .unwrap_or_default()
                    .split_whitespace()
                    .filter(|c| *c != "dark")
                    .collect::<Vec<_>>()
                    .join(" ");
                dom.set_attr(self.document, "class", classes);
            }
        }
        self.bus.publish(&PageEvent::ThemeChanged { dark });
    }

    pub async fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();
        {
            let mut dom = self.dom.lock();
            report.alert_icons = self.alerts.tick(&mut dom, now);
            report.copy_buttons = self.copies.tick(&mut dom, now);
            for view in self.copies.lifecycle_mut().views_mut() {
                if view.reset_if_due(&mut dom, now) {
                    report.copy_resets += 1;
                }
            }
        }
        report.diagrams = self.diagrams.tick(&self.dom, now).await;
        report
    }

    /// Activate the copy button `button`. Returns whether text was copied.
    pub fn click_copy(&mut self, button: NodeId, now: Instant) -> bool {
        let reset_after = self.config.copied_reset();
        let mut dom = self.dom.lock();
        match self
            .copies
            .lifecycle_mut()
            .views_mut()
            .find(|view| view.button() == button)
        {
            Some(view) => view.activate(&mut dom, &self.clipboard, now, reset_after),
            None => false,
        }
    }

    /// Queue every overlay for teardown and cancel in-flight renders
    pub fn unmount(&mut self) {
        tracing::debug!("Unmounting page {}", self.content);
        self.alerts.unmount();
        self.copies.unmount();
        self.diagrams.unmount();
    }
}
