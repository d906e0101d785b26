//! # quire-core
//!
//! Build-time half of quire.
//!
//! This crate turns a directory of authored markdown documents into sanitized,
//! statically servable artifacts: a metadata index plus one content blob per
//! document.

pub mod artifacts;
pub mod builder;
pub mod config;
pub mod frontmatter;
pub mod markdown;
pub mod metadata;
pub mod models;
pub mod sanitize;
pub mod slug;

pub use artifacts::{ArtifactError, ArtifactWriter};
pub use builder::{Batch, BuildError, SiteBuilder};
pub use config::{BuildMode, Config};
pub use markdown::{MarkdownProcessor, RenderedDocument};
pub use models::{ArtifactIndex, ContentBlob, DateStatus, Document, Frontmatter, PostSummary};
pub use sanitize::Policy;
pub use slug::slugify;
