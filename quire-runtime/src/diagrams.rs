//! Diagram rendering for fenced diagram blocks.
//!
//! Rendering is asynchronous and the page lock is never held across an
//! await: targets are collected under the lock, rendered without it, and the
//! results applied under the lock again after checking that the page was not
//! unmounted and the target is still attached.

use crate::error::{DiagramError, RuntimeError};
use crate::labels::{self, Labels};
use crate::overlay::{Lifecycle, View};
use crate::SharedDom;
use quire_core::Policy;
use quire_types::dom::{escape_text, Element};
use quire_types::{ContentId, Dom, NodeId, Selector};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DIAGRAM_CLASS: &str = "diagram";
pub const ERROR_CLASS: &str = "diagram-error";
pub const SOURCE_ATTR: &str = "data-diagram-source";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramTheme {
    Light,
    Dark,
}

impl DiagramTheme {
    /// Dark when the page's document element carries the `dark` class
    pub fn from_dom(dom: &Dom) -> Self {
        let dark = dom
            .element_children(dom.root())
            .first()
            .is_some_and(|el| dom.has_class(*el, "dark"));
        if dark {
            DiagramTheme::Dark
        } else {
            DiagramTheme::Light
        }
    }
}

/// Host diagram engine
pub trait DiagramEngine: Send + Sync {
    fn initialize(&self, theme: DiagramTheme);

    /// Render `source` to SVG markup; `id` is unique per render
    #[allow(async_fn_in_trait)]
    async fn render(&self, id: &str, source: &str) -> Result<String, DiagramError>;
}

/// Unmounts a renderer from outside the task that drives it.
///
/// Results arriving after [`UnmountHandle::unmount`] are discarded. The
/// renderer's next tick restores every diagram it mounted and stops scanning
/// until [`DiagramRenderer::mount`] is called again.
#[derive(Debug, Clone)]
pub struct UnmountHandle {
    epoch: Arc<AtomicU64>,
}

impl UnmountHandle {
    pub fn unmount(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagramState {
    Rendered,
    Failed,
}

pub struct DiagramView {
    /// The block that was replaced
    original: NodeId,
    wrapper: NodeId,
    state: DiagramState,
    unmounted: bool,
}

impl DiagramView {
    pub fn wrapper(&self) -> NodeId {
        self.wrapper
    }

    pub fn state(&self) -> DiagramState {
        self.state
    }
}

impl View for DiagramView {
    /// Put the static block back where the diagram was
    fn unmount(&mut self, dom: &mut Dom) -> Result<(), RuntimeError> {
        if self.unmounted {
            return Err(RuntimeError::AlreadyUnmounted);
        }
        self.unmounted = true;
        if dom.is_attached(self.wrapper) {
            dom.replace(self.wrapper, self.original);
        }
        Ok(())
    }
}

struct RenderJob {
    /// The `pre`, keyed in the lifecycle table
    target: NodeId,
    /// What gets replaced: the `pre` or its code-block wrapper
    block: NodeId,
    source: String,
}

pub struct DiagramRenderer<E: DiagramEngine> {
    engine: E,
    policy: Policy,
    labels: Arc<dyn Labels>,
    language: String,
    theme: Option<DiagramTheme>,
    epoch: Arc<AtomicU64>,
    /// Epoch this renderer last acted on; a mismatch means an external unmount
    observed_epoch: u64,
    next_render: u64,
    lifecycle: Lifecycle<DiagramView>,
}

impl<E: DiagramEngine> DiagramRenderer<E> {
    pub fn new(
        engine: E,
        labels: Arc<dyn Labels>,
        language: impl Into<String>,
        settle_delay: Duration,
    ) -> Self {
        Self {
            engine,
            policy: Policy::diagram(),
            labels,
            language: language.into(),
            theme: None,
            epoch: Arc::new(AtomicU64::new(0)),
            observed_epoch: 0,
            next_render: 0,
            lifecycle: Lifecycle::new(settle_delay),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn theme(&self) -> Option<DiagramTheme> {
        self.theme
    }

    pub fn lifecycle(&self) -> &Lifecycle<DiagramView> {
        &self.lifecycle
    }

    pub fn unmount_handle(&self) -> UnmountHandle {
        UnmountHandle {
            epoch: Arc::clone(&self.epoch),
        }
    }

    pub fn mount(&mut self, now: Instant, content: ContentId) {
        self.observed_epoch = self.epoch.load(Ordering::SeqCst);
        self.lifecycle.mount(now, content);
    }

    pub fn content_changed(&mut self, now: Instant, content: ContentId) {
        self.lifecycle.content_changed(now, content);
    }

    pub fn unmount(&mut self) {
        self.unmount_handle().unmount();
        self.sync_epoch();
    }

    /// Apply an unmount requested through an [`UnmountHandle`]. Returns true
    /// when one was pending.
    fn sync_epoch(&mut self) -> bool {
        let current = self.epoch.load(Ordering::SeqCst);
        if current == self.observed_epoch {
            return false;
        }
        self.observed_epoch = current;
        self.lifecycle.unmount();
        true
    }

    /// Drain teardown, follow theme changes, and render any due scan.
    /// Returns the number of diagrams rendered or re-rendered.
    pub async fn tick(&mut self, dom: &SharedDom, now: Instant) -> usize {
        let theme = {
            let mut dom = dom.lock();
            self.sync_epoch();
            self.lifecycle.drain_teardown(&mut dom);
            DiagramTheme::from_dom(&dom)
        };

        let mut rendered = 0;
        if self.theme.is_some_and(|current| current != theme) {
            rendered += self.rerender(dom, theme).await;
            if self.sync_epoch() {
                self.lifecycle.drain_teardown(&mut dom.lock());
                return rendered;
            }
        }

        if let Some(content) = self.lifecycle.take_scan(now) {
            if self.theme != Some(theme) {
                self.engine.initialize(theme);
                self.theme = Some(theme);
            }
            rendered += self.scan(dom, &content).await;
        }

        if self.sync_epoch() {
            self.lifecycle.drain_teardown(&mut dom.lock());
        }
        rendered
    }

    fn collect_jobs(&self, dom: &Dom) -> Vec<RenderJob> {
        dom.select(&Selector::tag("pre").attr("data-language"))
            .into_iter()
            .filter(|pre| {
                dom.attr(*pre, "data-language")
                    .is_some_and(|lang| lang.eq_ignore_ascii_case(&self.language))
            })
            .filter(|pre| !self.lifecycle.contains(*pre))
            .filter_map(|pre| {
                let source = dom.text_content(pre).trim().to_string();
                if source.is_empty() {
                    return None;
                }
                let block = dom
                    .parent(pre)
                    .filter(|parent| dom.has_class(*parent, "code-block"))
                    .unwrap_or(pre);
                Some(RenderJob {
                    target: pre,
                    block,
                    source,
                })
            })
            .collect()
    }

    async fn scan(&mut self, dom: &SharedDom, content: &ContentId) -> usize {
        let epoch = self.epoch.load(Ordering::SeqCst);
        let jobs = self.collect_jobs(&dom.lock());

        let mut rendered = 0;
        for job in jobs {
            let id = self.next_id();
            let result = self.engine.render(&id, &job.source).await;

            if self.epoch.load(Ordering::SeqCst) != epoch {
                tracing::debug!("Discarding diagram render {} after unmount", id);
                return rendered;
            }

            let mut dom = dom.lock();
            if !dom.is_attached(job.block) {
                tracing::debug!("Discarding diagram render {}: target detached", id);
                continue;
            }

            let (wrapper, state) = match result {
                Ok(svg) => {
                    rendered += 1;
                    (self.diagram_wrapper(&mut dom, &svg, &job.source), DiagramState::Rendered)
                }
                Err(e) => {
                    tracing::error!("Diagram render {} failed: {}", id, e);
                    (self.error_block(&mut dom, &e), DiagramState::Failed)
                }
            };
            dom.replace(job.block, wrapper);
            self.lifecycle.insert(
                job.target,
                content.clone(),
                DiagramView {
                    original: job.block,
                    wrapper,
                    state,
                    unmounted: false,
                },
            );
        }
        rendered
    }

    /// Re-render every mounted diagram from its recorded source. A failed
    /// re-render keeps the previous diagram.
    async fn rerender(&mut self, dom: &SharedDom, theme: DiagramTheme) -> usize {
        tracing::debug!("Theme changed to {:?}; re-rendering diagrams", theme);
        self.engine.initialize(theme);
        self.theme = Some(theme);

        let epoch = self.epoch.load(Ordering::SeqCst);
        let jobs: Vec<(NodeId, NodeId, String)> = {
            let dom = dom.lock();
            self.lifecycle
                .targets()
                .into_iter()
                .filter_map(|target| {
                    let view = self.lifecycle.get(target)?;
                    if view.state != DiagramState::Rendered || !dom.is_attached(view.wrapper) {
                        return None;
                    }
                    let source = dom.attr(view.wrapper, SOURCE_ATTR)?.to_string();
                    Some((target, view.wrapper, source))
                })
                .collect()
        };

        let mut rendered = 0;
        for (target, old_wrapper, source) in jobs {
            let id = self.next_id();
            let result = self.engine.render(&id, &source).await;

            if self.epoch.load(Ordering::SeqCst) != epoch {
                tracing::debug!("Discarding diagram re-render {} after unmount", id);
                return rendered;
            }

            let svg = match result {
                Ok(svg) => svg,
                Err(e) => {
                    tracing::error!("Diagram re-render {} failed, keeping previous: {}", id, e);
                    continue;
                }
            };

            let mut dom = dom.lock();
            if !dom.is_attached(old_wrapper) {
                continue;
            }
            let wrapper = self.diagram_wrapper(&mut dom, &svg, &source);
            dom.replace(old_wrapper, wrapper);
            if let Some(view) = self.lifecycle.get_mut(target) {
                view.wrapper = wrapper;
            }
            rendered += 1;
        }
        rendered
    }

    fn next_id(&mut self) -> String {
        self.next_render += 1;
        format!("quire-diagram-{}", self.next_render)
    }

    fn diagram_wrapper(&self, dom: &mut Dom, svg: &str, source: &str) -> NodeId {
        let wrapper = dom.create_element(
            Element::new("div")
                .with_attr("class", DIAGRAM_CLASS)
                .with_attr(SOURCE_ATTR, source),
        );
        dom.append_html(wrapper, &self.policy.clean(svg));
        wrapper
    }

    fn error_block(&self, dom: &mut Dom, error: &DiagramError) -> NodeId {
        let markup = format!(
            r#"<div class="{}" role="alert"><p>{}</p><p><code>{}</code></p></div>"#,
            ERROR_CLASS,
            escape_text(&self.labels.label(labels::DIAGRAM_ERROR)),
            escape_text(&error.to_string()),
        );
        let clean = self.policy.clean(&markup);
        let nodes = dom.parse_detached(&clean);
        let block = nodes.into_iter().find(|n| dom.element(*n).is_some());
        match block {
            Some(block) => block,
            None => dom.create_element(
                Element::new("div")
                    .with_attr("class", ERROR_CLASS)
                    .with_attr("role", "alert"),
            ),
        }
    }
}
