//! Shared types for quire
//!
//! This crate provides the types used by both the build-time pipeline and the
//! runtime enhancement layer: content identities, table-of-contents entries,
//! alert kinds, and the arena [`dom`] that both sides mutate.

pub mod dom;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use dom::{Dom, NodeId, Selector};

/// Identity of one displayed content set (usually a document slug)
///
/// The runtime layer compares identities to decide whether injected artifacts
/// belong to the content currently on screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId(pub String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        ContentId(id.to_string())
    }
}

/// One heading of a document, as listed in its table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

impl TocEntry {
    pub fn new(id: impl Into<String>, text: impl Into<String>, level: u8) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            level,
        }
    }
}

/// Callout kinds recognized in `[!TYPE]` quote markers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AlertKind {
    pub const ALL: [AlertKind; 5] = [
        AlertKind::Note,
        AlertKind::Tip,
        AlertKind::Important,
        AlertKind::Warning,
        AlertKind::Caution,
    ];

    /// Parse a marker name, ignoring case. Unknown names yield `None`.
    pub fn from_marker(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "note" => Some(AlertKind::Note),
            "tip" => Some(AlertKind::Tip),
            "important" => Some(AlertKind::Important),
            "warning" => Some(AlertKind::Warning),
            "caution" => Some(AlertKind::Caution),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::Note => "note",
            AlertKind::Tip => "tip",
            AlertKind::Important => "important",
            AlertKind::Warning => "warning",
            AlertKind::Caution => "caution",
        }
    }

    /// Display label: the capitalized kind name
    pub fn label(&self) -> &'static str {
        match self {
            AlertKind::Note => "Note",
            AlertKind::Tip => "Tip",
            AlertKind::Important => "Important",
            AlertKind::Warning => "Warning",
            AlertKind::Caution => "Caution",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_kind_from_marker() {
        assert_eq!(AlertKind::from_marker("TIP"), Some(AlertKind::Tip));
        assert_eq!(AlertKind::from_marker("tIp"), Some(AlertKind::Tip));
        assert_eq!(AlertKind::from_marker("Caution"), Some(AlertKind::Caution));
        assert_eq!(AlertKind::from_marker("FOO"), None);
        assert_eq!(AlertKind::from_marker(""), None);
    }

    #[test]
    fn test_alert_labels_are_capitalized() {
        for kind in AlertKind::ALL {
            let label = kind.label();
            assert_eq!(label.to_lowercase(), kind.as_str());
            assert!(label.chars().next().unwrap().is_uppercase());
        }
    }
}
