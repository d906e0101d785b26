use quire_runtime::{NavKey, RuntimeConfig, ScrollSpy, SpyHost};
use quire_types::TocEntry;
use std::collections::HashMap;

/// Scripted page geometry that records every side effect
#[derive(Default)]
struct FakeHost {
    offsets: HashMap<String, f64>,
    entries: HashMap<String, (f64, f64)>,
    observed: Vec<String>,
    disconnects: usize,
    mutation_watches: usize,
    frame_requests: usize,
    panel_top: f64,
    panel_height: f64,
    panel_scroll_height: f64,
    scrolls: Vec<(f64, bool)>,
    fragment: Option<String>,
    scrolled_into_view: Vec<String>,
}

impl FakeHost {
    fn new() -> Self {
        Self {
            panel_height: 200.0,
            panel_scroll_height: 1000.0,
            ..Default::default()
        }
    }

    fn with_heading(mut self, id: &str, offset: f64, entry_top: f64) -> Self {
        self.offsets.insert(id.to_string(), offset);
        self.entries.insert(id.to_string(), (entry_top, 20.0));
        self
    }

    fn scroll_by(&mut self, delta: f64) {
        for offset in self.offsets.values_mut() {
            *offset -= delta;
        }
    }
}

impl SpyHost for FakeHost {
    fn heading_offset(&self, id: &str) -> Option<f64> {
        self.offsets.get(id).copied()
    }

    fn observe_heading(&mut self, id: &str) {
        self.observed.push(id.to_string());
    }

    fn disconnect_headings(&mut self) {
        self.disconnects += 1;
    }

    fn observe_content_mutations(&mut self) {
        self.mutation_watches += 1;
    }

    fn request_animation_frame(&mut self) {
        self.frame_requests += 1;
    }

    fn panel_scroll_top(&self) -> f64 {
        self.panel_top
    }

    fn panel_height(&self) -> f64 {
        self.panel_height
    }

    fn panel_scroll_height(&self) -> f64 {
        self.panel_scroll_height
    }

    fn entry_bounds(&self, id: &str) -> Option<(f64, f64)> {
        self.entries.get(id).copied()
    }

    fn scroll_panel_to(&mut self, top: f64, smooth: bool) {
        self.panel_top = top;
        self.scrolls.push((top, smooth));
    }

    fn replace_fragment(&mut self, id: &str) {
        self.fragment = Some(id.to_string());
    }

    fn scroll_heading_into_view(&mut self, id: &str) {
        self.scrolled_into_view.push(id.to_string());
    }
}

fn toc(ids: &[&str]) -> Vec<TocEntry> {
    ids.iter().map(|id| TocEntry::new(*id, *id, 2)).collect()
}

fn spy() -> ScrollSpy {
    ScrollSpy::new(&RuntimeConfig::default())
}

#[test]
fn resolves_and_observes_present_headings() {
    let mut host = FakeHost::new()
        .with_heading("a", 10.0, 0.0)
        .with_heading("b", 400.0, 20.0);
    let mut spy = spy();
    spy.set_headings(&mut host, &toc(&["a", "b", "missing"]));

    assert_eq!(host.observed, vec!["a", "b"]);
    assert_eq!(host.mutation_watches, 1);
    assert_eq!(host.frame_requests, 1);

    // Same list again changes nothing
    spy.set_headings(&mut host, &toc(&["a", "b", "missing"]));
    assert_eq!(host.disconnects, 1);

    // The missing heading shows up later
    host.offsets.insert("missing".into(), 900.0);
    spy.on_animation_frame(&mut host);
    spy.on_mutation(&mut host);
    assert_eq!(host.observed, vec!["a", "b", "missing"]);
}

#[test]
fn recompute_is_throttled_to_one_frame() {
    let mut host = FakeHost::new().with_heading("a", 10.0, 0.0);
    let mut spy = spy();
    spy.set_headings(&mut host, &toc(&["a"]));
    assert_eq!(host.frame_requests, 1);

    for _ in 0..10 {
        spy.on_scroll(&mut host);
        spy.on_resize(&mut host);
        spy.on_intersection(&mut host);
    }
    assert_eq!(host.frame_requests, 1);
    assert!(spy.frame_pending());

    spy.on_animation_frame(&mut host);
    assert!(!spy.frame_pending());
    spy.on_scroll(&mut host);
    assert_eq!(host.frame_requests, 2);
}

#[test]
fn active_heading_follows_scroll() {
    let mut host = FakeHost::new()
        .with_heading("intro", 50.0, 0.0)
        .with_heading("setup", 600.0, 20.0)
        .with_heading("usage", 1400.0, 40.0);
    let mut spy = spy();
    spy.set_headings(&mut host, &toc(&["intro", "setup", "usage"]));

    assert_eq!(spy.on_animation_frame(&mut host).as_deref(), Some("intro"));

    host.scroll_by(500.0);
    spy.on_scroll(&mut host);
    assert_eq!(spy.on_animation_frame(&mut host).as_deref(), Some("setup"));

    // Unchanged active heading reports nothing
    host.scroll_by(10.0);
    spy.on_scroll(&mut host);
    assert_eq!(spy.on_animation_frame(&mut host), None);
    assert_eq!(spy.active(), Some("setup"));

    host.scroll_by(5000.0);
    spy.on_scroll(&mut host);
    assert_eq!(spy.on_animation_frame(&mut host).as_deref(), Some("usage"));
}

#[test]
fn active_entry_outside_panel_is_centered() {
    let mut host = FakeHost::new()
        .with_heading("a", -900.0, 0.0)
        .with_heading("b", 100.0, 500.0);
    let mut spy = spy();
    spy.set_headings(&mut host, &toc(&["a", "b"]));
    spy.on_animation_frame(&mut host);

    assert_eq!(spy.active(), Some("b"));
    // 500 - (200 - 20) / 2
    assert_eq!(host.scrolls, vec![(410.0, true)]);
}

#[test]
fn visible_entry_does_not_scroll_panel() {
    let mut host = FakeHost::new().with_heading("a", 10.0, 40.0);
    let mut spy = spy();
    spy.set_headings(&mut host, &toc(&["a"]));
    spy.on_animation_frame(&mut host);
    assert!(host.scrolls.is_empty());
}

#[test]
fn keyboard_navigation_clamps() {
    let mut host = FakeHost::new();
    let mut spy = spy();

    spy.handle_key(&mut host, NavKey::ArrowUp);
    assert_eq!(host.panel_top, 0.0);

    spy.handle_key(&mut host, NavKey::ArrowDown);
    assert_eq!(host.panel_top, 40.0);

    spy.handle_key(&mut host, NavKey::PageDown);
    assert_eq!(host.panel_top, 220.0);

    spy.handle_key(&mut host, NavKey::End);
    assert_eq!(host.panel_top, 800.0);

    spy.handle_key(&mut host, NavKey::PageDown);
    assert_eq!(host.panel_top, 800.0);

    spy.handle_key(&mut host, NavKey::PageUp);
    assert_eq!(host.panel_top, 620.0);

    spy.handle_key(&mut host, NavKey::Home);
    assert_eq!(host.panel_top, 0.0);
}

#[test]
fn select_updates_fragment_and_scrolls() {
    let mut host = FakeHost::new().with_heading("setup", 600.0, 0.0);
    let mut spy = spy();
    spy.select(&mut host, "setup");
    assert_eq!(host.fragment.as_deref(), Some("setup"));
    assert_eq!(host.scrolled_into_view, vec!["setup"]);
}
