//! Error types for cbv.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for inspection, resolution and storage.
#[derive(Error, Debug)]
pub enum CbvError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A deferred value wraps a function with no known lazy spelling.
    /// The table of lazy functions is out of sync with the inspected framework.
    #[error("'{function}' not in known lazily called functions")]
    UnknownLazyFunction { function: String },

    #[error("Invalid object dump: {0}")]
    InvalidDump(String),

    #[error("Invalid record order: {0}")]
    InvalidRecordOrder(String),

    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid store structure: {0}")]
    InvalidStructure(String),

    #[error("No snapshot for {project} {version}")]
    SnapshotNotFound { project: String, version: String },
}

pub type Result<T> = std::result::Result<T, CbvError>;
