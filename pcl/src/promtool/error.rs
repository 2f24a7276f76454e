//! Promtool error types

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Which promtool subcommand was run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// `promtool check rules`
    Check,
    /// `promtool test rules`
    Test,
}

impl Operation {
    /// Command-line arguments preceding the file name
    pub fn args(self) -> [&'static str; 2] {
        match self {
            Self::Check => ["check", "rules"],
            Self::Test => ["test", "rules"],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [cmd, what] = self.args();
        write!(f, "{} {}", cmd, what)
    }
}

/// Why a promtool invocation failed
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("could not run: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("exited with status {}", .0.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    Exit(Option<i32>),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors from validating rule files
#[derive(Debug, Error)]
pub enum PromtoolError {
    #[error("promtool not found in PATH (looked for {})", .searched.join(", "))]
    NotFound { searched: Vec<String> },

    #[error(
        "{exe} {operation} {path} {cause}\nstdout:\n{stdout}\nstderr:\n{stderr}",
        exe = .executable.display(),
        path = .file.display()
    )]
    Failed {
        executable: PathBuf,
        operation: Operation,
        file: PathBuf,
        stdout: String,
        stderr: String,
        #[source]
        cause: FailureCause,
    },

    #[error("No rule files to {operation} in {dir}")]
    NoFiles { operation: Operation, dir: PathBuf },

    #[error("Invalid rule file pattern in {dir}: {source}")]
    Pattern {
        dir: PathBuf,
        #[source]
        source: glob::PatternError,
    },
}

impl PromtoolError {
    /// Captured standard error of a failed run
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
