//! Frontmatter parsing from markdown files.

use crate::models::Frontmatter;
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

static FRONTMATTER_REGEX: OnceLock<Regex> = OnceLock::new();

fn frontmatter_regex() -> &'static Regex {
    FRONTMATTER_REGEX.get_or_init(|| {
        Regex::new(r"(?s)^---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|$)(.*)$")
            .expect("static regex")
    })
}

/// Parse frontmatter from markdown content
///
/// Returns a tuple of (frontmatter, markdown_body).
/// If no frontmatter is present, returns default frontmatter with the full content as body.
///
/// # Example
///
/// ```
/// use quire_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: My Post\ndate: 2025-01-01\n---\n# Hello World\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.title.as_deref(), Some("My Post"));
/// assert!(body.trim().starts_with("# Hello World"));
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some(captures) = frontmatter_regex().captures(content) else {
        return Ok((Frontmatter::default(), content.to_string()));
    };

    let yaml = captures.get(1).map_or("", |m| m.as_str());
    let body = captures.get(2).map_or("", |m| m.as_str());

    // An empty block (or one holding only comments) deserializes as null
    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        match serde_yaml::from_str::<Option<Frontmatter>>(yaml)? {
            Some(fm) => fm,
            None => Frontmatter::default(),
        }
    };

    Ok((frontmatter, body.to_string()))
}
