//! Overlay lifecycle: settle-delayed scans, idempotent injection, queued teardown.
//!
//! A [`Coordinator`] pairs an [`Injector`] with a [`Lifecycle`] table. The
//! table maps each enhanced target node to the view mounted for it, and is
//! the only record of what has been processed: the served markup is never
//! tagged.

use crate::error::RuntimeError;
use quire_types::{ContentId, Dom, NodeId};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Something mounted into the page for one target
pub trait View: Send {
    /// Remove the view from the page. Must tolerate a detached target.
    fn unmount(&mut self, dom: &mut Dom) -> Result<(), RuntimeError>;
}

/// Finds targets in the page and mounts views onto them
pub trait Injector: Send {
    type View: View;

    fn name(&self) -> &'static str;

    /// Candidate targets, in document order
    fn targets(&self, dom: &Dom) -> Vec<NodeId>;

    /// Mount a view on `target`. `None` means the target was skipped.
    fn inject(&mut self, dom: &mut Dom, target: NodeId) -> Option<Self::View>;
}

#[derive(Debug)]
pub struct InjectionRecord<V> {
    pub target: NodeId,
    pub content: ContentId,
    pub view: V,
}

/// Node-keyed table of mounted views plus a teardown queue
pub struct Lifecycle<V> {
    settle_delay: Duration,
    mounted: bool,
    content: Option<ContentId>,
    scan_at: Option<Instant>,
    records: BTreeMap<NodeId, InjectionRecord<V>>,
    teardown: Vec<InjectionRecord<V>>,
}

impl<V: View> Lifecycle<V> {
    pub fn new(settle_delay: Duration) -> Self {
        Self {
            settle_delay,
            mounted: false,
            content: None,
            scan_at: None,
            records: BTreeMap::new(),
            teardown: Vec::new(),
        }
    }

    pub fn mount(&mut self, now: Instant, content: ContentId) {
        self.mounted = true;
        self.schedule(now, content);
    }

    /// New content replaced the old: everything mounted so far is retired
    pub fn content_changed(&mut self, now: Instant, content: ContentId) {
        self.retire_all();
        if self.mounted {
            self.schedule(now, content);
        }
    }

    /// Stop scanning and queue every view for teardown on the next drain
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.scan_at = None;
        self.retire_all();
    }

    fn schedule(&mut self, now: Instant, content: ContentId) {
        self.content = Some(content);
        self.scan_at = Some(now + self.settle_delay);
    }

    fn retire_all(&mut self) {
        let records = std::mem::take(&mut self.records);
        self.teardown.extend(records.into_values());
    }

    /// Unmount queued views. Failures are logged, never propagated.
    pub fn drain_teardown(&mut self, dom: &mut Dom) -> usize {
        let queued = std::mem::take(&mut self.teardown);
        let count = queued.len();
        for mut record in queued {
            if let Err(e) = record.view.unmount(dom) {
                tracing::warn!(
                    "Teardown of view for {:?} ({}) failed: {}",
                    record.target,
                    record.content,
                    e
                );
            }
        }
        count
    }

    pub fn scan_due(&self, now: Instant) -> bool {
        self.mounted && self.scan_at.is_some_and(|at| now >= at)
    }

    /// Consume the pending scan if its settle delay has passed
    pub fn take_scan(&mut self, now: Instant) -> Option<ContentId> {
        if !self.scan_due(now) {
            return None;
        }
        self.scan_at = None;
        self.content.clone()
    }

    pub fn contains(&self, target: NodeId) -> bool {
        self.records.contains_key(&target)
    }

    pub fn insert(&mut self, target: NodeId, content: ContentId, view: V) {
        self.records.insert(
            target,
            InjectionRecord {
                target,
                content,
                view,
            },
        );
    }

    pub fn get(&self, target: NodeId) -> Option<&V> {
        self.records.get(&target).map(|r| &r.view)
    }

    pub fn get_mut(&mut self, target: NodeId) -> Option<&mut V> {
        self.records.get_mut(&target).map(|r| &mut r.view)
    }

    pub fn targets(&self) -> Vec<NodeId> {
        self.records.keys().copied().collect()
    }

    pub fn views_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.records.values_mut().map(|r| &mut r.view)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn pending_teardown(&self) -> usize {
        self.teardown.len()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn content(&self) -> Option<&ContentId> {
        self.content.as_ref()
    }
}

/// Drives one injector through the shared lifecycle
pub struct Coordinator<I: Injector> {
    injector: I,
    lifecycle: Lifecycle<I::View>,
}

impl<I: Injector> Coordinator<I> {
    pub fn new(injector: I, settle_delay: Duration) -> Self {
        Self {
            injector,
            lifecycle: Lifecycle::new(settle_delay),
        }
    }

    pub fn mount(&mut self, now: Instant, content: ContentId) {
        self.lifecycle.mount(now, content);
    }

    pub fn content_changed(&mut self, now: Instant, content: ContentId) {
        self.lifecycle.content_changed(now, content);
    }

    pub fn unmount(&mut self) {
        self.lifecycle.unmount();
    }

    /// Drain pending teardown, then scan if one is due. Returns the number of
    /// views mounted.
    pub fn tick(&mut self, dom: &mut Dom, now: Instant) -> usize {
        self.lifecycle.drain_teardown(dom);
        match self.lifecycle.take_scan(now) {
            Some(content) => self.scan(dom, &content),
            None => 0,
        }
    }

    fn scan(&mut self, dom: &mut Dom, content: &ContentId) -> usize {
        let mut mounted = 0;
        for target in self.injector.targets(dom) {
            if self.lifecycle.contains(target) {
                continue;
            }
            if let Some(view) = self.injector.inject(dom, target) {
                self.lifecycle.insert(target, content.clone(), view);
                mounted += 1;
            }
        }
        if mounted > 0 {
            tracing::debug!("{}: mounted {} views for {}", self.injector.name(), mounted, content);
        }
        mounted
    }

    pub fn injector(&self) -> &I {
        &self.injector
    }

    pub fn lifecycle(&self) -> &Lifecycle<I::View> {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut Lifecycle<I::View> {
        &mut self.lifecycle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_types::dom::Element;
    use quire_types::Selector;

    struct Marker {
        node: NodeId,
        unmounted: bool,
    }

    impl View for Marker {
        fn unmount(&mut self, dom: &mut Dom) -> Result<(), RuntimeError> {
            if self.unmounted {
                return Err(RuntimeError::AlreadyUnmounted);
            }
            self.unmounted = true;
            dom.detach(self.node);
            Ok(())
        }
    }

    struct BadgeInjector;

    impl Injector for BadgeInjector {
        type View = Marker;

        fn name(&self) -> &'static str {
            "badges"
        }

        fn targets(&self, dom: &Dom) -> Vec<NodeId> {
            dom.select(&Selector::tag("p"))
        }

        fn inject(&mut self, dom: &mut Dom, target: NodeId) -> Option<Marker> {
            let node = dom.create_element(Element::new("b"));
            dom.append_child(target, node);
            Some(Marker {
                node,
                unmounted: false,
            })
        }
    }

    const SETTLE: Duration = Duration::from_millis(50);

    #[test]
    fn test_scan_waits_for_settle_delay() {
        let mut dom = Dom::parse_fragment("<p>a</p><p>b</p>");
        let mut coordinator = Coordinator::new(BadgeInjector, SETTLE);
        let start = Instant::now();
        coordinator.mount(start, ContentId::new("post"));

        assert_eq!(coordinator.tick(&mut dom, start + Duration::from_millis(10)), 0);
        assert_eq!(coordinator.tick(&mut dom, start + SETTLE), 2);
        assert_eq!(coordinator.tick(&mut dom, start + SETTLE * 2), 0);
        assert_eq!(dom.select(&Selector::tag("b")).len(), 2);
    }

    #[test]
    fn test_content_change_retires_and_rescans() {
        let mut dom = Dom::parse_fragment("<p>a</p>");
        let mut coordinator = Coordinator::new(BadgeInjector, SETTLE);
        let start = Instant::now();
        coordinator.mount(start, ContentId::new("one"));
        coordinator.tick(&mut dom, start + SETTLE);

        coordinator.content_changed(start + SETTLE, ContentId::new("two"));
        assert_eq!(coordinator.lifecycle().pending_teardown(), 1);
        assert_eq!(coordinator.tick(&mut dom, start + SETTLE * 2), 1);
        assert_eq!(dom.select(&Selector::tag("b")).len(), 1);
        assert_eq!(coordinator.lifecycle().content(), Some(&ContentId::new("two")));
    }

    #[test]
    fn test_unmount_queues_until_next_tick() {
        let mut dom = Dom::parse_fragment("<p>a</p>");
        let mut coordinator = Coordinator::new(BadgeInjector, SETTLE);
        let start = Instant::now();
        coordinator.mount(start, ContentId::new("post"));
        coordinator.tick(&mut dom, start + SETTLE);

        coordinator.unmount();
        assert_eq!(dom.select(&Selector::tag("b")).len(), 1);
        coordinator.tick(&mut dom, start + SETTLE * 2);
        assert!(dom.select(&Selector::tag("b")).is_empty());
        assert!(coordinator.lifecycle().is_empty());
    }

    #[test]
    fn test_teardown_failure_is_swallowed() {
        let mut dom = Dom::parse_fragment("<p>a</p>");
        let mut lifecycle = Lifecycle::new(SETTLE);
        let node = dom.select(&Selector::tag("p"))[0];
        lifecycle.insert(
            node,
            ContentId::new("post"),
            Marker {
                node,
                unmounted: true,
            },
        );
        lifecycle.unmount();
        assert_eq!(lifecycle.drain_teardown(&mut dom), 1);
        assert_eq!(lifecycle.pending_teardown(), 0);
    }
}
