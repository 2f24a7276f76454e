//! Sink error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by rule sinks
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("{namespace}/{name} already exists")]
    AlreadyExists { namespace: String, name: String },

    #[error("{namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("Update of {namespace}/{name} has no resource version")]
    MissingResourceVersion { namespace: String, name: String },

    #[error("Update of {namespace}/{name} is stale: has version {presented}, stored is {stored}")]
    Conflict {
        namespace: String,
        name: String,
        presented: String,
        stored: String,
    },

    #[error("Invalid object name '{0}'")]
    InvalidName(String),

    #[error("Sink I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt stored object {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SinkError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}
