//! Template and expansion error types

use std::path::PathBuf;
use thiserror::Error;

use super::Expansions;
use crate::vars::VarsError;

/// Errors that can occur while parsing a template directory
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Invalid template pattern in {dir}: {source}")]
    Pattern {
        dir: PathBuf,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template {name}: {source}")]
    Syntax {
        name: String,
        #[source]
        source: handlebars::TemplateError,
    },
}

/// Errors that can occur while expanding a source directory for a context
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("Invalid context name '{context}': {reason}")]
    InvalidContext { context: String, reason: &'static str },

    #[error(transparent)]
    Variables(#[from] VarsError),

    #[error(transparent)]
    Templates(#[from] TemplateError),

    #[error("Failed to create output directory under {root} for context {context}: {source}")]
    CreateOutput {
        context: String,
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template {template} for context {context}: {source}")]
    Render {
        context: String,
        template: String,
        #[source]
        source: handlebars::RenderError,
    },

    #[error("Failed to write {path} for context {context}: {source}")]
    Write {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid fixture pattern in {dir}: {source}")]
    FixturePattern {
        dir: PathBuf,
        #[source]
        source: glob::PatternError,
    },

    #[error("Failed to copy fixture {file} for context {context}: {source}")]
    CopyFixture {
        context: String,
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A run of [`ExpansionEngine::expand_all`](super::ExpansionEngine::expand_all)
/// that stopped early
///
/// Contexts expanded before the failure are handed back so their output
/// directories can still be disposed or kept.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExpansionFailure {
    pub completed: Expansions,
    pub error: ExpandError,
}

impl From<ExpandError> for ExpansionFailure {
    fn from(error: ExpandError) -> Self {
        Self {
            completed: Expansions::default(),
            error,
        }
    }
}

impl ExpandError {
    /// The context this error belongs to, if it is context-specific
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::InvalidContext { context, .. }
            | Self::CreateOutput { context, .. }
            | Self::Render { context, .. }
            | Self::Write { context, .. }
            | Self::CopyFixture { context, .. } => Some(context),
            Self::Variables(_) | Self::Templates(_) | Self::FixturePattern { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_error_names_context_and_file() {
        let err = ExpandError::Write {
            context: "prod".to_string(),
            path: PathBuf::from("/tmp/out/node.yaml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        let msg = err.to_string();
        assert!(msg.contains("prod"));
        assert!(msg.contains("/tmp/out/node.yaml"));
        assert_eq!(err.context(), Some("prod"));
    }

    #[test]
    fn test_invalid_context_message() {
        let err = ExpandError::InvalidContext {
            context: "a/b".to_string(),
            reason: "contains a path separator",
        };
        assert!(err.to_string().contains("a/b"));
    }

    #[test]
    fn test_expansion_failure_displays_underlying_error() {
        let failure = ExpansionFailure::from(ExpandError::InvalidContext {
            context: "a/b".to_string(),
            reason: "contains a path separator",
        });
        assert!(failure.completed.is_empty());
        assert_eq!(failure.to_string(), failure.error.to_string());
        assert_eq!(failure.error.context(), Some("a/b"));
    }
}
