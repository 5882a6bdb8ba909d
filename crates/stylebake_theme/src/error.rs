//! Theme shape errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShapeError {
    /// Failed to read a shape file
    #[error("Failed to read theme shape {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Shape file is not valid JSON
    #[error("Invalid JSON theme shape: {0}")]
    Json(#[from] serde_json::Error),

    /// Shape file is not valid TOML
    #[error("Invalid TOML theme shape: {0}")]
    Toml(#[from] toml::de::Error),

    /// Shape file extension is neither `.json` nor `.toml`
    #[error("Unsupported theme shape format: {0}")]
    UnsupportedFormat(String),

    /// The theme instance is not an object at its root
    #[error("Theme shape root must be an object")]
    NotAnObject,

    /// No preset with this id
    #[error("Unknown theme preset: {0}")]
    UnknownPreset(String),

    /// An iteration marker names an enumeration with no key set
    #[error("No key set for enumeration '{0}'")]
    UnknownEnumeration(String),

    /// Unknown build target name
    #[error("Unknown build target: {0}")]
    UnknownTarget(String),
}

/// Result type for theme shape operations
pub type Result<T> = std::result::Result<T, ShapeError>;
