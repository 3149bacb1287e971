//! Error types for printguard.

use std::path::PathBuf;

use thiserror::Error;

/// printguard error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No git repository found in your current working directory")]
    NotARepository,

    #[error("Failed to resolve repository root: {0}")]
    RootResolution(String),

    #[error("Failed to list staged changes: {0}")]
    ChangeListing(String),

    #[error("Content search failed: {0}")]
    ScanExecution(String),

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("No existing config at {}", .0.display())]
    NoExistingConfig(PathBuf),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Hook installation failed: {0}")]
    HookInstall(String),

    #[error("Interactive input requires a terminal")]
    NoTerminal,
}

impl Error {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
