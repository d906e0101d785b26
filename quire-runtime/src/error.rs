//! Runtime error types.

use thiserror::Error;

/// Runtime errors
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("View already unmounted")]
    AlreadyUnmounted,

    #[error("Invalid runtime config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiagramError {
    #[error("Render failed: {0}")]
    Render(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard unavailable")]
    Unavailable,

    #[error("Copy rejected: {0}")]
    Rejected(String),
}
