//! Artifact output: `index.json`, `posts/<slug>.json`, `highlight.css`.

use crate::markdown::highlight::highlight_css;
use crate::models::{ArtifactIndex, Document};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const INDEX_FILE: &str = "index.json";
pub const POSTS_DIR: &str = "posts";
pub const HIGHLIGHT_CSS_FILE: &str = "highlight.css";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {0}: {1}")]
    Json(&'static str, #[source] serde_json::Error),
}

/// Writes the artifact set for one batch
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn posts_dir(&self) -> PathBuf {
        self.output_dir.join(POSTS_DIR)
    }

    pub fn blob_path(&self, slug: &str) -> PathBuf {
        self.posts_dir().join(format!("{}.json", slug))
    }

    /// Write one blob per document, prune stale blobs, then write the index.
    ///
    /// The index is written last so it never lists a blob that is missing.
    pub fn write(&self, documents: &[Document]) -> Result<ArtifactIndex, ArtifactError> {
        let posts_dir = self.posts_dir();
        fs::create_dir_all(&posts_dir).map_err(|source| ArtifactError::Io {
            path: posts_dir.clone(),
            source,
        })?;

        for doc in documents {
            write_json(&self.blob_path(&doc.slug), &doc.blob(), "content blob")?;
        }

        let keep: HashSet<&str> = documents.iter().map(|d| d.slug.as_str()).collect();
        let pruned = self.prune_stale(&keep)?;
        if pruned > 0 {
            tracing::info!("Removed {} stale content blobs", pruned);
        }

        self.write_highlight_css();

        let index = ArtifactIndex::new(documents);
        write_json(&self.output_dir.join(INDEX_FILE), &index, "index")?;
        tracing::info!(
            "Wrote {} with {} posts to {:?}",
            INDEX_FILE,
            index.posts.len(),
            self.output_dir
        );

        Ok(index)
    }

    /// Artifact set with no documents, used when the build cannot run at all
    pub fn write_empty(&self) -> Result<ArtifactIndex, ArtifactError> {
        self.write(&[])
    }

    fn prune_stale(&self, keep: &HashSet<&str>) -> Result<usize, ArtifactError> {
        let posts_dir = self.posts_dir();
        let entries = fs::read_dir(&posts_dir).map_err(|source| ArtifactError::Io {
            path: posts_dir.clone(),
            source,
        })?;

        let mut removed = 0;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == "json") {
                continue;
            }
            let stale = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|slug| !keep.contains(slug));
            if stale {
                fs::remove_file(&path).map_err(|source| ArtifactError::Io {
                    path: path.clone(),
                    source,
                })?;
                tracing::debug!("Removed stale blob {:?}", path);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Stylesheet for highlighted code; failure only costs the colors
    fn write_highlight_css(&self) {
        let path = self.output_dir.join(HIGHLIGHT_CSS_FILE);
        match highlight_css() {
            Ok(css) => {
                if let Err(e) = fs::write(&path, css) {
                    tracing::warn!("Failed to write {:?}: {}", path, e);
                }
            }
            Err(e) => tracing::warn!("Failed to generate highlight stylesheet: {}", e),
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &'static str) -> Result<(), ArtifactError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ArtifactError::Json(what, e))?;
    fs::write(path, json).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentBlob, DateStatus};
    use quire_types::TocEntry;
    use tempfile::tempdir;

    fn doc(slug: &str) -> Document {
        Document {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            date: None,
            date_status: DateStatus::Missing,
            author: "Anonymous".into(),
            excerpt: "An excerpt".into(),
            image: None,
            image_alt: Some(slug.to_uppercase()),
            tags: vec!["rust".into()],
            category: "rust".into(),
            read_time: "1 min read".into(),
            raw_content: "# Body".into(),
            content: "<h1 id=\"body\">Body</h1>".into(),
            toc: vec![TocEntry::new("body", "Body", 1)],
            source_path: PathBuf::from(format!("{}.md", slug)),
        }
    }

    #[test]
    fn test_write_index_and_blobs() {
        let dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        let index = writer.write(&[doc("a"), doc("b")]).unwrap();
        assert_eq!(index.slugs, vec!["a", "b"]);

        let raw = fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["posts"].as_array().unwrap().len(), 2);
        assert!(json["lastBuilt"].is_string());
        for post in json["posts"].as_array().unwrap() {
            assert!(post.get("content").is_none());
            assert!(post.get("rawContent").is_none());
        }

        let blob: ContentBlob =
            serde_json::from_str(&fs::read_to_string(writer.blob_path("a")).unwrap()).unwrap();
        assert_eq!(blob.toc[0].id, "body");
        assert!(dir.path().join(HIGHLIGHT_CSS_FILE).exists());
    }

    #[test]
    fn test_stale_blobs_pruned() {
        let dir = tempdir().unwrap();
        let writer = ArtifactWriter::new(dir.path());
        writer.write(&[doc("a"), doc("b")]).unwrap();
        writer.write(&[doc("b")]).unwrap();
        assert!(!writer.blob_path("a").exists());
        assert!(writer.blob_path("b").exists());
    }

    #[test]
    fn test_write_empty() {
        let dir = tempdir().unwrap();
        let index = ArtifactWriter::new(dir.path().join("out")).write_empty().unwrap();
        assert!(index.posts.is_empty());
        assert!(dir.path().join("out").join(INDEX_FILE).exists());
    }
}
