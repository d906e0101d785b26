//! Batch building: discover documents, run the pipeline, order the results.

use crate::{
    config::{BuildMode, Config},
    frontmatter::parse_frontmatter,
    markdown::{images::normalize_src, MarkdownProcessor, TransformOptions},
    metadata,
    models::*,
    slug::slugify,
};
use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] crate::frontmatter::FrontmatterError),

    #[error("Duplicate slug: {0}")]
    DuplicateSlug(String),

    #[error("Cannot derive a slug from {0:?}")]
    EmptySlug(PathBuf),

    #[error("Pipeline panicked: {0}")]
    Panicked(String),
}

/// Result of one build: the documents that made it, and the ones that did not
#[derive(Debug, Default)]
pub struct Batch {
    /// Dated documents newest first, then undated ones in encounter order
    pub documents: Vec<Document>,
    pub failures: Vec<(PathBuf, BuildError)>,
}

impl Batch {
    pub fn slugs(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.slug.as_str()).collect()
    }
}

/// Main batch builder
pub struct SiteBuilder {
    config: Config,
    processor: MarkdownProcessor,
    options: TransformOptions,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Self {
        let options = TransformOptions::from(&config);
        Self {
            config,
            processor: MarkdownProcessor::new(),
            options,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Build every document in the content directory.
    ///
    /// Per-document failures are logged and excluded; they never abort the batch.
    pub fn build(&self) -> Batch {
        let content_dir = self.config.content_dir();
        if !content_dir.is_dir() {
            tracing::warn!(
                "Content directory {:?} does not exist; producing an empty batch",
                content_dir
            );
            return Batch::default();
        }

        let files = discover_markdown_files(&content_dir);
        tracing::info!("Found {} markdown files", files.len());

        let mut documents = Vec::with_capacity(files.len());
        let mut failures = Vec::new();
        let mut seen_slugs = HashSet::new();

        for path in files {
            let result = panic::catch_unwind(AssertUnwindSafe(|| self.build_document(&path)))
                .unwrap_or_else(|payload| Err(BuildError::Panicked(panic_message(&*payload))));

            match result {
                Ok(doc) => {
                    if seen_slugs.insert(doc.slug.clone()) {
                        documents.push(doc);
                    } else {
                        let err = BuildError::DuplicateSlug(doc.slug);
                        tracing::error!("Skipping {:?}: {}", path, err);
                        failures.push((path, err));
                    }
                }
                Err(err) => {
                    tracing::error!("Failed to build {:?}: {}", path, err);
                    failures.push((path, err));
                }
            }
        }

        let documents = order_documents(documents);
        tracing::info!(
            "Built {} documents ({} excluded)",
            documents.len(),
            failures.len()
        );

        Batch {
            documents,
            failures,
        }
    }

    /// Parse and render a single file
    pub fn build_document(&self, path: &Path) -> Result<Document, BuildError> {
        let source = fs::read_to_string(path)?;
        let (frontmatter, body) = parse_frontmatter(&source)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let slug = slugify(&stem);
        if slug.is_empty() {
            return Err(BuildError::EmptySlug(path.to_path_buf()));
        }

        let rendered = self.processor.render(&body, &self.options);
        let site = &self.config.site;
        let pipeline = &self.config.pipeline;

        let title = non_empty(frontmatter.title.as_deref()).unwrap_or(stem);
        let date_status = DateStatus::from_value(frontmatter.date.as_ref());

        let excerpt = match non_empty(frontmatter.excerpt.as_deref()) {
            Some(excerpt) => excerpt,
            None => rendered
                .lead
                .as_deref()
                .map(|lead| metadata::excerpt(lead, pipeline.excerpt_length))
                .unwrap_or_default(),
        };

        let read_time = frontmatter
            .read_time
            .as_ref()
            .and_then(metadata::read_time_override)
            .unwrap_or_else(|| {
                metadata::format_read_time(metadata::reading_minutes(
                    &rendered.text,
                    pipeline.words_per_minute,
                ))
            });

        let image = non_empty(frontmatter.image.as_deref()).map(|src| {
            match self.options.mode {
                BuildMode::Publish => normalize_src(&src, &pipeline.static_prefix).unwrap_or(src),
                BuildMode::Development => src,
            }
        });
        let image_alt = non_empty(frontmatter.image_alt.as_deref()).or_else(|| Some(title.clone()));

        let category = metadata::category(
            frontmatter.category.as_deref(),
            &frontmatter.tags,
            &site.default_category,
        );

        Ok(Document {
            slug,
            title,
            date: date_status.date(),
            date_status,
            author: non_empty(frontmatter.author.as_deref())
                .unwrap_or_else(|| site.default_author.clone()),
            excerpt,
            image,
            image_alt,
            tags: frontmatter.tags,
            category,
            read_time,
            raw_content: body,
            content: rendered.html,
            toc: rendered.toc,
            source_path: path.to_path_buf(),
        })
    }
}

/// Markdown files under `dir`, in file-name order
fn discover_markdown_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == "md" || ext == "markdown")
        })
        .map(|e| e.into_path())
        .collect()
}

/// Dated documents newest first (stable), then undated ones in encounter order
pub fn order_documents(documents: Vec<Document>) -> Vec<Document> {
    let (mut dated, undated): (Vec<_>, Vec<_>) =
        documents.into_iter().partition(|d| d.date.is_some());

    dated.sort_by(|a, b| b.date.cmp(&a.date));

    for doc in &undated {
        match doc.date_status {
            DateStatus::Invalid => tracing::warn!(
                "{}: date is invalid, unparseable; listed after dated documents",
                doc.slug
            ),
            _ => tracing::warn!(
                "{}: date is missing; listed after dated documents",
                doc.slug
            ),
        }
    }

    dated.extend(undated);
    dated
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
