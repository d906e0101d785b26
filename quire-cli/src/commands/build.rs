//! Build command implementation.

use super::load_config;
use anyhow::{Context, Result};
use quire_core::{ArtifactWriter, BuildMode, Config, SiteBuilder};
use std::path::Path;

/// Build every document and write the artifact set.
///
/// When the build cannot run at all the error is logged and an empty artifact
/// set is written in its place, so consumers always find an index.
pub fn build_site(config_path: &Path, mode: Option<BuildMode>) -> Result<()> {
    let config = match load_config(config_path, mode) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}; writing an empty artifact set", e);
            let mut fallback = Config::defaults_at(config_path);
            if let Some(mode) = mode {
                fallback.mode = mode;
            }
            return write_empty(&fallback);
        }
    };

    tracing::info!("Building in {} mode", config.mode);
    let batch = SiteBuilder::new(config.clone()).build();
    for (path, err) in &batch.failures {
        tracing::warn!("Excluded {:?}: {}", path, err);
    }

    let writer = ArtifactWriter::new(config.output_dir());
    match writer.write(&batch.documents) {
        Ok(index) => {
            tracing::info!(
                "Build complete: {} posts, {} excluded",
                index.posts.len(),
                batch.failures.len()
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Failed to write artifacts: {}; writing an empty artifact set", e);
            write_empty(&config)
        }
    }
}

fn write_empty(config: &Config) -> Result<()> {
    ArtifactWriter::new(config.output_dir())
        .write_empty()
        .context("Failed to write empty artifact set")?;
    Ok(())
}
