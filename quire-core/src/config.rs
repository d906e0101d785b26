//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Main configuration struct matching the quire.yml schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,

    pub mode: BuildMode,

    pub site: SiteConfig,

    pub pipeline: PipelineConfig,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

/// Whether artifacts are produced for publishing or for local preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Publish,
    Development,
}

impl BuildMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Publish => "publish",
            BuildMode::Development => "development",
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "publish" | "production" => Ok(BuildMode::Publish),
            "development" | "dev" => Ok(BuildMode::Development),
            other => Err(format!("unknown build mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding the authored documents
    pub content: PathBuf,
    /// Directory receiving index.json and the per-document blobs
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: PathBuf::from("content/posts"),
            output: PathBuf::from("public/generated"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub default_author: String,
    pub default_category: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            default_author: "Anonymous".to_string(),
            default_category: "General".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Prefix stripped from image references in publish mode
    pub static_prefix: String,
    /// Fenced-block language rendered as a diagram at runtime
    pub diagram_language: String,
    pub words_per_minute: u32,
    /// Maximum length of a generated excerpt, in characters
    pub excerpt_length: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            static_prefix: "/public".to_string(),
            diagram_language: "mermaid".to_string(),
            words_per_minute: 225,
            excerpt_length: 160,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file does not exist.
    ///
    /// Paths in the default configuration still resolve relative to the
    /// directory the config file would have lived in.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::from_file(path);
        }

        tracing::debug!("No config at {:?}; using defaults", path);
        Ok(Self::defaults_at(path))
    }

    /// Default configuration whose paths resolve next to `path`
    pub fn defaults_at<P: AsRef<Path>>(path: P) -> Self {
        Config {
            config_path: Some(path.as_ref().to_path_buf()),
            ..Config::default()
        }
    }

    /// Get the content directory, resolved relative to config file
    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    /// Get the output directory, resolved relative to config file
    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config_path.as_deref().and_then(Path::parent) {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    }
}
