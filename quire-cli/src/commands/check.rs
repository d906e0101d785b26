//! Check command: run the pipeline, write nothing.

use super::load_config;
use anyhow::Result;
use quire_core::{BuildMode, SiteBuilder};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct CheckReport {
    mode: String,
    documents: Vec<String>,
    failures: Vec<CheckFailure>,
}

#[derive(Serialize)]
struct CheckFailure {
    path: String,
    error: String,
}

pub fn check_site(config_path: &Path, mode: Option<BuildMode>, json: bool) -> Result<()> {
    let config = load_config(config_path, mode)?;
    let batch = SiteBuilder::new(config.clone()).build();

    let report = CheckReport {
        mode: config.mode.to_string(),
        documents: batch.slugs().into_iter().map(str::to_string).collect(),
        failures: batch
            .failures
            .iter()
            .map(|(path, err)| CheckFailure {
                path: path.display().to_string(),
                error: err.to_string(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} documents built, {} failed ({} mode)",
            report.documents.len(),
            report.failures.len(),
            report.mode
        );
        for failure in &report.failures {
            println!("  {}: {}", failure.path, failure.error);
        }
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} documents failed to build", report.failures.len());
    }
    Ok(())
}
