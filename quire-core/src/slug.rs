//! Slug generation and normalization.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use unicode_segmentation::UnicodeSegmentation;

static HYPHEN_RUNS: OnceLock<Regex> = OnceLock::new();

fn hyphen_runs() -> &'static Regex {
    HYPHEN_RUNS.get_or_init(|| Regex::new(r"-+").expect("static regex"))
}

/// Convert a string to a URL-safe slug
///
/// Rules:
/// - Lowercase
/// - Replace whitespace and underscores with hyphens
/// - Remove special characters (except hyphens), keeping unicode letters
/// - Collapse multiple hyphens
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use quire_core::slugify;
///
/// assert_eq!(slugify("Hello World"), "hello-world");
/// assert_eq!(slugify("Rust & Safety"), "rust-safety");
/// ```
pub fn slugify(input: &str) -> String {
    let cleaned = input
        .to_lowercase()
        .graphemes(true)
        .filter_map(|g| {
            let c = g.chars().next()?;
            if c.is_whitespace() || c == '_' {
                Some("-")
            } else if c.is_ascii_alphanumeric() || c == '-' || c.is_alphabetic() {
                Some(g)
            } else {
                None
            }
        })
        .collect::<String>();

    hyphen_runs()
        .replace_all(&cleaned, "-")
        .trim_matches('-')
        .to_string()
}

/// Hands out unique slugs within one document, suffixing repeats with `-1`, `-2`, ...
#[derive(Debug, Default)]
pub struct SlugAllocator {
    seen: HashMap<String, usize>,
}

impl SlugAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an explicit id so later generated slugs avoid it
    pub fn reserve(&mut self, id: &str) {
        self.seen.entry(id.to_string()).or_insert(0);
    }

    /// Slugify `text` and make it unique; empty text becomes `section`
    pub fn allocate(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "section".to_string();
        }

        let Some(count) = self.seen.get(&base).copied() else {
            self.seen.insert(base.clone(), 0);
            return base;
        };

        let mut n = count + 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.seen.contains_key(&candidate) {
                self.seen.insert(base, n);
                self.seen.insert(candidate.clone(), 0);
                return candidate;
            }
            n += 1;
        }
    }
}
