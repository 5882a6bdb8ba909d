//! Compiler error types
//!
//! Per-site failures are not errors at this level: they become
//! [`Diagnostic`](stylebake_core::Diagnostic)s in the run report. The types here
//! cover failures that stop a whole run.

use std::path::PathBuf;
use thiserror::Error;

/// Cache document failures
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to read or write the cache file
    #[error("Cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to encode the cache document
    #[error("Failed to encode cache document: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Run-level compiler errors
#[derive(Error, Debug)]
pub enum CompileError {
    /// Failed to read or write a project file
    #[error("I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid include/exclude pattern
    #[error("Invalid source pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// Source walking failed
    #[error("Failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// A file task panicked or was cancelled
    #[error("Extraction task failed: {0}")]
    Task(String),

    /// The run exceeded its time budget
    #[error("Run timed out after {0}s")]
    Timeout(u64),
}

impl CompileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for compiler runs
pub type Result<T> = std::result::Result<T, CompileError>;
