//! # quire-runtime
//!
//! Progressive enhancement for pages rendered from quire artifacts.
//!
//! Everything here operates on a shared [`Dom`] parsed from the served
//! markup. Platform services (clipboard, geometry, history, animation frames,
//! the diagram engine) are traits implemented by the host, and time is passed
//! in explicitly as [`std::time::Instant`] values so every delay is driven by
//! the host's ticks.

pub mod alert_icons;
pub mod config;
pub mod copy_buttons;
pub mod diagrams;
pub mod error;
pub mod events;
pub mod labels;
pub mod overlay;
pub mod page;
pub mod scroll_spy;

use parking_lot::Mutex;
use quire_types::Dom;
use std::sync::Arc;

pub use alert_icons::AlertIconInjector;
pub use config::RuntimeConfig;
pub use copy_buttons::{Clipboard, CopyButtonInjector};
pub use diagrams::{DiagramEngine, DiagramRenderer, DiagramTheme, UnmountHandle};
pub use error::{ClipboardError, DiagramError, RuntimeError, RuntimeResult};
pub use events::{EventBus, EventKind, PageEvent, Subscription};
pub use labels::{EnglishLabels, Labels};
pub use overlay::{Coordinator, Injector, Lifecycle, View};
pub use page::{Page, TickReport};
pub use scroll_spy::{NavKey, ScrollSpy, SpyHost};

/// The page tree, shared between the page, its overlays and async renders
pub type SharedDom = Arc<Mutex<Dom>>;

pub fn shared(dom: Dom) -> SharedDom {
    Arc::new(Mutex::new(dom))
}
