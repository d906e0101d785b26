//! Table-of-contents scroll spy.
//!
//! Tracks which heading the reader is on, keeps its entry visible in the
//! contents panel, and handles keyboard scrolling of the panel. All geometry
//! and browser services come from a [`SpyHost`].

use crate::config::RuntimeConfig;
use quire_types::TocEntry;
use std::collections::HashSet;

/// Geometry, observers, history and animation frames of the hosting page
pub trait SpyHost {
    /// Offset of the heading's top from the viewport top; `None` when the
    /// heading is not in the document
    fn heading_offset(&self, id: &str) -> Option<f64>;

    fn observe_heading(&mut self, id: &str);
    fn disconnect_headings(&mut self);
    fn observe_content_mutations(&mut self);

    fn request_animation_frame(&mut self);

    fn panel_scroll_top(&self) -> f64;
    fn panel_height(&self) -> f64;
    fn panel_scroll_height(&self) -> f64;
    /// Top and height of a heading's entry within the panel's scroll content
    fn entry_bounds(&self, id: &str) -> Option<(f64, f64)>;
    fn scroll_panel_to(&mut self, top: f64, smooth: bool);

    /// Replace the location fragment without navigating
    fn replace_fragment(&mut self, id: &str);
    fn scroll_heading_into_view(&mut self, id: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    Home,
    End,
}

impl NavKey {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(NavKey::ArrowUp),
            "ArrowDown" => Some(NavKey::ArrowDown),
            "PageUp" => Some(NavKey::PageUp),
            "PageDown" => Some(NavKey::PageDown),
            "Home" => Some(NavKey::Home),
            "End" => Some(NavKey::End),
            _ => None,
        }
    }
}

/// Pick the active heading from `(id, viewport offset)` pairs.
///
/// Before anything has scrolled past the top the first heading is active.
/// After that it is the last heading at or above the compensation line,
/// falling back to the first.
pub fn pick_active(offsets: &[(String, f64)], compensation: f64) -> Option<&str> {
    let mut sorted: Vec<(&str, f64)> = offsets.iter().map(|(id, o)| (id.as_str(), *o)).collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1));

    let (first, first_offset) = *sorted.first()?;
    if first_offset >= 0.0 {
        return Some(first);
    }
    sorted
        .iter()
        .rev()
        .find(|(_, offset)| *offset <= compensation)
        .map(|(id, _)| *id)
        .or(Some(first))
}

pub struct ScrollSpy {
    compensation: f64,
    line_step: f64,
    page_ratio: f64,
    headings: Vec<TocEntry>,
    resolved: HashSet<String>,
    active: Option<String>,
    frame_pending: bool,
    watching_mutations: bool,
}

impl ScrollSpy {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            compensation: config.compensation_offset,
            line_step: config.line_step,
            page_ratio: config.page_ratio,
            headings: Vec::new(),
            resolved: HashSet::new(),
            active: None,
            frame_pending: false,
            watching_mutations: false,
        }
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn headings(&self) -> &[TocEntry] {
        &self.headings
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Start tracking a new heading list. An identical list is a no-op.
    pub fn set_headings(&mut self, host: &mut dyn SpyHost, headings: &[TocEntry]) {
        if self.headings == headings {
            return;
        }
        host.disconnect_headings();
        self.headings = headings.to_vec();
        self.resolved.clear();
        self.active = None;
        self.resolve(host);

        if !self.watching_mutations {
            host.observe_content_mutations();
            self.watching_mutations = true;
        }
        self.schedule(host);
    }

    fn resolve(&mut self, host: &mut dyn SpyHost) {
        for heading in &self.headings {
            if self.resolved.contains(&heading.id) || host.heading_offset(&heading.id).is_none() {
                continue;
            }
            host.observe_heading(&heading.id);
            self.resolved.insert(heading.id.clone());
        }
    }

    pub fn on_scroll(&mut self, host: &mut dyn SpyHost) {
        self.schedule(host);
    }

    pub fn on_resize(&mut self, host: &mut dyn SpyHost) {
        self.schedule(host);
    }

    pub fn on_intersection(&mut self, host: &mut dyn SpyHost) {
        self.schedule(host);
    }

    /// Content changed: headings that have appeared get observed
    pub fn on_mutation(&mut self, host: &mut dyn SpyHost) {
        self.resolve(host);
        self.schedule(host);
    }

    fn schedule(&mut self, host: &mut dyn SpyHost) {
        if !self.frame_pending {
            self.frame_pending = true;
            host.request_animation_frame();
        }
    }

    /// Recompute the active heading. Returns the new id when it changed.
    pub fn on_animation_frame(&mut self, host: &mut dyn SpyHost) -> Option<String> {
        self.frame_pending = false;

        let offsets: Vec<(String, f64)> = self
            .headings
            .iter()
            .filter(|h| self.resolved.contains(&h.id))
            .filter_map(|h| host.heading_offset(&h.id).map(|offset| (h.id.clone(), offset)))
            .collect();

        let next = pick_active(&offsets, self.compensation)?.to_string();
        if self.active.as_deref() == Some(next.as_str()) {
            return None;
        }
        tracing::trace!("Active heading: {}", next);
        self.active = Some(next.clone());
        self.reveal(host, &next);
        Some(next)
    }

    /// Center the entry in the panel when it is outside the visible region
    fn reveal(&self, host: &mut dyn SpyHost, id: &str) {
        let Some((top, height)) = host.entry_bounds(id) else {
            return;
        };
        let view_top = host.panel_scroll_top();
        let view_height = host.panel_height();
        if top >= view_top && top + height <= view_top + view_height {
            return;
        }
        let target = top - (view_height - height) / 2.0;
        let target = self.clamp(host, target);
        host.scroll_panel_to(target, true);
    }

    fn clamp(&self, host: &dyn SpyHost, top: f64) -> f64 {
        let max = (host.panel_scroll_height() - host.panel_height()).max(0.0);
        top.clamp(0.0, max)
    }

    /// Scroll the panel for a navigation key
    pub fn handle_key(&mut self, host: &mut dyn SpyHost, key: NavKey) {
        let current = host.panel_scroll_top();
        let page = host.panel_height() * self.page_ratio;
        let target = match key {
            NavKey::ArrowUp => current - self.line_step,
            NavKey::ArrowDown => current + self.line_step,
            NavKey::PageUp => current - page,
            NavKey::PageDown => current + page,
            NavKey::Home => 0.0,
            NavKey::End => f64::MAX,
        };
        let target = self.clamp(host, target);
        host.scroll_panel_to(target, false);
    }

    /// A contents entry was chosen
    pub fn select(&mut self, host: &mut dyn SpyHost, id: &str) {
        host.replace_fragment(id);
        host.scroll_heading_into_view(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(pairs: &[(&str, f64)]) -> Vec<(String, f64)> {
        pairs.iter().map(|(id, o)| (id.to_string(), *o)).collect()
    }

    #[test]
    fn test_first_heading_before_scrolling() {
        let o = offsets(&[("a", 20.0), ("b", 500.0), ("c", 1200.0)]);
        assert_eq!(pick_active(&o, 140.0), Some("a"));
    }

    #[test]
    fn test_last_heading_above_line() {
        let o = offsets(&[("a", -800.0), ("b", -100.0), ("c", 120.0), ("d", 600.0)]);
        assert_eq!(pick_active(&o, 140.0), Some("c"));
    }

    #[test]
    fn test_all_headings_above_line() {
        let o = offsets(&[("a", -900.0), ("b", -400.0), ("c", -10.0)]);
        assert_eq!(pick_active(&o, 140.0), Some("c"));
    }

    #[test]
    fn test_mixed_offsets() {
        let o = offsets(&[("a", -50.0), ("b", 30.0), ("c", 200.0)]);
        assert_eq!(pick_active(&o, 140.0), Some("b"));
    }

    #[test]
    fn test_unsorted_input() {
        let o = offsets(&[("c", 400.0), ("a", -300.0), ("b", 90.0)]);
        assert_eq!(pick_active(&o, 140.0), Some("b"));
    }

    #[test]
    fn test_no_headings() {
        assert_eq!(pick_active(&[], 140.0), None);
    }

    #[test]
    fn test_nav_keys() {
        assert_eq!(NavKey::from_key("PageDown"), Some(NavKey::PageDown));
        assert_eq!(NavKey::from_key("Tab"), None);
    }
}
