//! Variable loading errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading variable layers
#[derive(Debug, Error)]
pub enum VarsError {
    #[error("Failed to read variables file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse variables file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid variables file pattern in {dir}: {source}")]
    Pattern {
        dir: PathBuf,
        #[source]
        source: glob::PatternError,
    },
}
