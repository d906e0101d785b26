//! Runtime tuning knobs.

use crate::error::RuntimeResult;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for one page's enhancement layer.
///
/// Usually embedded in the page as JSON; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Wait after a mount or content change before scanning, in milliseconds
    pub settle_delay_ms: u64,
    /// How long a copy button shows its "copied" label, in milliseconds
    pub copied_reset_ms: u64,
    /// Distance from the viewport top at which a heading counts as read, in px
    pub compensation_offset: f64,
    /// Keyboard scroll step for the table of contents, in px
    pub line_step: f64,
    /// Fraction of the panel height scrolled by PageUp/PageDown
    pub page_ratio: f64,
    /// Fenced-block language rendered as a diagram
    pub diagram_language: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50,
            copied_reset_ms: 2000,
            compensation_offset: 140.0,
            line_step: 40.0,
            page_ratio: 0.9,
            diagram_language: "mermaid".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> RuntimeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn copied_reset(&self) -> Duration {
        Duration::from_millis(self.copied_reset_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(50));
        assert_eq!(config.copied_reset(), Duration::from_secs(2));
        assert_eq!(config.compensation_offset, 140.0);
    }

    #[test]
    fn test_partial_json() {
        let config = RuntimeConfig::from_json(r#"{"compensationOffset": 96}"#).unwrap();
        assert_eq!(config.compensation_offset, 96.0);
        assert_eq!(config.diagram_language, "mermaid");
        assert!(RuntimeConfig::from_json("{").is_err());
    }
}
