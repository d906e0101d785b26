//! Ordered tree-rewrite stages.

use super::alerts::AlertStage;
use super::code_blocks::CodeBlockWrapStage;
use super::floating_images::FloatingImageStage;
use super::highlight::HighlightStage;
use super::images::ImagePathStage;
use super::tables::TableWrapStage;
use crate::config::{BuildMode, Config};
use quire_types::dom::{Dom, NodeId};
use std::collections::{HashMap, HashSet};

/// Settings shared by every stage of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub mode: BuildMode,
    /// Prefix stripped from image sources in publish mode
    pub static_prefix: String,
    /// Fenced-block language rendered as a diagram at runtime
    pub diagram_language: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            mode: BuildMode::Publish,
            static_prefix: "/public".to_string(),
            diagram_language: "mermaid".to_string(),
        }
    }
}

impl From<&Config> for TransformOptions {
    fn from(config: &Config) -> Self {
        Self {
            mode: config.mode,
            static_prefix: config.pipeline.static_prefix.clone(),
            diagram_language: config.pipeline.diagram_language.to_lowercase(),
        }
    }
}

impl TransformOptions {
    pub fn is_diagram(&self, language: &str) -> bool {
        language.eq_ignore_ascii_case(&self.diagram_language)
    }
}

/// Per-run state threaded through the stages.
///
/// Each stage records the nodes it has handled here instead of tagging the
/// markup itself.
#[derive(Debug, Default)]
pub struct TransformContext {
    options: TransformOptions,
    visited: HashMap<&'static str, HashSet<NodeId>>,
}

impl TransformContext {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            visited: HashMap::new(),
        }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Record `node` as handled by `stage`. Returns false if it already was.
    pub fn mark_visited(&mut self, stage: &'static str, node: NodeId) -> bool {
        self.visited.entry(stage).or_default().insert(node)
    }

    pub fn is_visited(&self, stage: &'static str, node: NodeId) -> bool {
        self.visited
            .get(stage)
            .is_some_and(|nodes| nodes.contains(&node))
    }
}

/// One rewrite over the whole tree
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, dom: &mut Dom, ctx: &mut TransformContext);
}

/// Stages applied in a fixed order
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// alerts → image paths → floating images → highlighting → code-block wrap → table wrap
    pub fn standard() -> Self {
        Self {
            stages: vec![
                Box::new(AlertStage),
                Box::new(ImagePathStage),
                Box::new(FloatingImageStage),
                Box::new(HighlightStage),
                Box::new(CodeBlockWrapStage),
                Box::new(TableWrapStage),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub fn run(&self, dom: &mut Dom, ctx: &mut TransformContext) {
        for stage in &self.stages {
            tracing::trace!(stage = stage.name(), "applying stage");
            stage.apply(dom, ctx);
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}
