//! Typed page event bus.
//!
//! Dispatch is synchronous. Each listener runs in isolation: an error or a
//! panic in one is logged and the remaining listeners still run.

use parking_lot::Mutex;
use quire_types::ContentId;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ThemeChanged,
    ContentChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    ThemeChanged { dark: bool },
    ContentChanged { content: ContentId },
}

impl PageEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PageEvent::ThemeChanged { .. } => EventKind::ThemeChanged,
            PageEvent::ContentChanged { .. } => EventKind::ContentChanged,
        }
    }
}

type Listener = Arc<dyn Fn(&PageEvent) -> anyhow::Result<()> + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: HashMap<EventKind, Vec<(u64, Listener)>>,
}

/// Handle returned by [`EventBus::subscribe`].
///
/// Dropping it leaves the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    kind: EventKind,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Remove the listener. Returns false when the bus is gone or the
    /// listener was already removed.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let Some(listeners) = registry.listeners.get_mut(&self.kind) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(id, _)| *id != self.id);
        listeners.len() != before
    }
}

#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Mutex<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, listener: F) -> Subscription
    where
        F: Fn(&PageEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            kind,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every listener of its kind. Returns how many
    /// listeners completed successfully.
    pub fn publish(&self, event: &PageEvent) -> usize {
        // Snapshot so listeners may subscribe or unsubscribe while running
        let listeners: Vec<Listener> = self
            .registry
            .lock()
            .listeners
            .get(&event.kind())
            .map(|ls| ls.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default();

        let mut delivered = 0;
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(e)) => tracing::error!("Listener for {:?} failed: {:#}", event.kind(), e),
                Err(_) => tracing::error!("Listener for {:?} panicked", event.kind()),
            }
        }
        delivered
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry
            .lock()
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_by_kind() {
        let bus = EventBus::new();
        let themes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&themes);
        bus.subscribe(EventKind::ThemeChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        bus.publish(&PageEvent::ThemeChanged { dark: true });
        bus.publish(&PageEvent::ContentChanged {
            content: ContentId::new("a"),
        });
        assert_eq!(themes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_listeners_are_isolated() {
        let bus = EventBus::new();
        let reached = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventKind::ThemeChanged, |_| anyhow::bail!("listener failed"));
        bus.subscribe(EventKind::ThemeChanged, |_| panic!("listener panicked"));
        let counter = Arc::clone(&reached);
        bus.subscribe(EventKind::ThemeChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        assert_eq!(bus.publish(&PageEvent::ThemeChanged { dark: false }), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let sub = bus.subscribe(EventKind::ContentChanged, |_| Ok(()));
        assert_eq!(bus.listener_count(EventKind::ContentChanged), 1);
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert_eq!(bus.listener_count(EventKind::ContentChanged), 0);
    }
}
