//! CLI command implementations.

pub mod build;
pub mod check;

pub use build::build_site;
pub use check::check_site;

use anyhow::{Context, Result};
use quire_core::{BuildMode, Config};
use std::path::Path;

/// Load the config (defaults when absent) and apply a `--mode` override
pub(crate) fn load_config(config_path: &Path, mode: Option<BuildMode>) -> Result<Config> {
    tracing::info!("Loading config from {:?}", config_path);
    let mut config =
        Config::load_or_default(config_path).context("Failed to load configuration")?;
    if let Some(mode) = mode {
        config.mode = mode;
    }
    Ok(config)
}
