//! Content model structs for documents and the artifacts written from them.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use quire_types::TocEntry;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Frontmatter metadata from markdown files.
///
/// Every field is optional; missing values are derived later (see
/// [`crate::metadata`]). Keys are camelCase as authored, with snake_case
/// aliases accepted.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Frontmatter {
    #[serde(default)]
    pub title: Option<String>,

    /// Kept as raw YAML so both strings and unquoted timestamps parse
    #[serde(default)]
    pub date: Option<serde_yaml::Value>,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub excerpt: Option<String>,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(default, alias = "image_alt")]
    pub image_alt: Option<String>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub tags: Vec<String>,

    #[serde(default)]
    pub category: Option<String>,

    /// Either a display string ("7 min read") or a number of minutes
    #[serde(default, alias = "read_time")]
    pub read_time: Option<serde_yaml::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(tag)) => vec![tag],
        Some(OneOrMany::Many(tags)) => tags,
    })
}

/// Outcome of reading a document's `date` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStatus {
    Valid(DateTime<FixedOffset>),
    Missing,
    Invalid,
}

impl DateStatus {
    pub fn from_value(value: Option<&serde_yaml::Value>) -> Self {
        let raw = match value {
            None | Some(serde_yaml::Value::Null) => return DateStatus::Missing,
            Some(serde_yaml::Value::String(s)) => s.trim().to_string(),
            Some(serde_yaml::Value::Number(n)) => n.to_string(),
            Some(_) => return DateStatus::Invalid,
        };
        if raw.is_empty() {
            return DateStatus::Missing;
        }
        match parse_date(&raw) {
            Some(date) => DateStatus::Valid(date),
            None => DateStatus::Invalid,
        }
    }

    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            DateStatus::Valid(date) => Some(*date),
            _ => None,
        }
    }
}

/// Parse the date formats authors actually write.
///
/// Accepts RFC 3339, `YYYY-MM-DD`, and `YYYY-MM-DD HH:MM[:SS]` (space or `T`
/// separated). Dates without an offset are taken as UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date);
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive).into());
        }
    }

    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let naive = day.and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&naive).into())
}

/// A single document after the pipeline has run
#[derive(Debug, Clone)]
pub struct Document {
    /// URL slug derived from the file stem
    pub slug: String,

    pub title: String,

    /// Publication date; `None` when missing or unparseable
    pub date: Option<DateTime<FixedOffset>>,

    pub date_status: DateStatus,

    pub author: String,

    pub excerpt: String,

    pub image: Option<String>,

    pub image_alt: Option<String>,

    pub tags: Vec<String>,

    pub category: String,

    /// Display string, e.g. "4 min read"
    pub read_time: String,

    /// Authored body without frontmatter
    pub raw_content: String,

    /// Sanitized markup
    pub content: String,

    pub toc: Vec<TocEntry>,

    pub source_path: PathBuf,
}

impl Document {
    pub fn summary(&self) -> PostSummary {
        PostSummary::from(self)
    }

    pub fn blob(&self) -> ContentBlob {
        ContentBlob {
            content: self.content.clone(),
            toc: self.toc.clone(),
        }
    }
}

/// Index entry for one document. Never carries the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub date: Option<String>,
    pub author: String,
    pub excerpt: String,
    pub image: Option<String>,
    pub image_alt: Option<String>,
    pub tags: Vec<String>,
    pub read_time: String,
    pub category: String,
}

impl From<&Document> for PostSummary {
    fn from(doc: &Document) -> Self {
        Self {
            slug: doc.slug.clone(),
            title: doc.title.clone(),
            date: doc.date.map(|d| d.to_rfc3339()),
            author: doc.author.clone(),
            excerpt: doc.excerpt.clone(),
            image: doc.image.clone(),
            image_alt: doc.image_alt.clone(),
            tags: doc.tags.clone(),
            read_time: doc.read_time.clone(),
            category: doc.category.clone(),
        }
    }
}

/// Per-document artifact: `posts/<slug>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlob {
    pub content: String,
    pub toc: Vec<TocEntry>,
}

/// Aggregate artifact: `index.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactIndex {
    pub posts: Vec<PostSummary>,
    pub slugs: Vec<String>,
    pub last_built: String,
}

impl ArtifactIndex {
    pub fn new(documents: &[Document]) -> Self {
        Self {
            posts: documents.iter().map(PostSummary::from).collect(),
            slugs: documents.iter().map(|d| d.slug.clone()).collect(),
            last_built: Utc::now().to_rfc3339(),
        }
    }

    pub fn empty() -> Self {
        Self::new(&[])
    }
}
