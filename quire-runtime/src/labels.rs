//! Display strings for injected controls.

pub const COPY: &str = "code.copy";
pub const COPIED: &str = "code.copied";
pub const COPY_ARIA: &str = "code.copy.aria";
pub const DIAGRAM_ERROR: &str = "diagram.error";

/// Key → display string lookup
pub trait Labels: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// The display string, or the key itself when nothing is registered
    fn label(&self, key: &str) -> String {
        self.get(key).unwrap_or_else(|| key.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishLabels;

impl Labels for EnglishLabels {
    fn get(&self, key: &str) -> Option<String> {
        let text = match key {
            COPY => "Copy",
            COPIED => "Copied!",
            COPY_ARIA => "Copy code to clipboard",
            DIAGRAM_ERROR => "This diagram could not be rendered.",
            _ => return None,
        };
        Some(text.to_string())
    }
}
