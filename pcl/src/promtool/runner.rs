//! Running the `promtool` executable

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use super::{FailureCause, Operation, PromtoolError, RuleChecker};

/// Executable names looked up in `PATH`, in order
pub const EXECUTABLE_NAMES: [&str; 2] = ["promtool.exe", "promtool"];

/// `promtool` invoked as a child process
#[derive(Debug, Clone)]
pub struct Promtool {
    executable: PathBuf,
    timeout: Duration,
}

impl Promtool {
    /// Per-invocation time limit unless configured otherwise
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Use an explicit executable
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        let executable = executable.into();
        debug!(?executable, "Promtool::new: called");
        Self {
            executable,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Locate the executable in `PATH`
    pub fn find() -> Result<Self, PromtoolError> {
        debug!("Promtool::find: called");
        let path = std::env::var_os("PATH").unwrap_or_default();
        Self::find_in(&path)
    }

    /// Locate the executable in a `PATH`-style list of directories
    ///
    /// Every directory is searched for the first name before falling back to
    /// the next name.
    pub fn find_in(search_path: &OsStr) -> Result<Self, PromtoolError> {
        for name in EXECUTABLE_NAMES {
            for dir in std::env::split_paths(search_path) {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    debug!(?candidate, "Promtool::find_in: found");
                    return Ok(Self::new(candidate));
                }
            }
        }
        debug!("Promtool::find_in: not found");
        Err(PromtoolError::NotFound {
            searched: EXECUTABLE_NAMES.iter().map(|n| n.to_string()).collect(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn run(&self, operation: Operation, file: &Path, workdir: Option<&Path>) -> Result<String, PromtoolError> {
        debug!(executable = ?self.executable, %operation, ?file, ?workdir, "Promtool::run: called");
        let start = Instant::now();

        let mut command = tokio::process::Command::new(&self.executable);
        command.args(operation.args()).arg(file).kill_on_drop(true);
        if let Some(dir) = workdir {
            command.current_dir(dir);
        }

        let failed = |stdout: String, stderr: String, cause: FailureCause| PromtoolError::Failed {
            executable: self.executable.clone(),
            operation,
            file: file.to_path_buf(),
            stdout,
            stderr,
            cause,
        };

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!(error = %e, "Promtool::run: command execution failed");
                return Err(failed(String::new(), String::new(), FailureCause::Spawn(e)));
            }
            Err(_) => {
                debug!("Promtool::run: command timed out");
                return Err(failed(String::new(), String::new(), FailureCause::Timeout(self.timeout)));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let duration_ms = start.elapsed().as_millis() as u64;
        debug!(code = ?output.status.code(), duration_ms, "Promtool::run: command completed");

        if output.status.success() {
            Ok(stdout)
        } else {
            Err(failed(stdout, stderr, FailureCause::Exit(output.status.code())))
        }
    }
}

#[async_trait]
impl RuleChecker for Promtool {
    async fn check(&self, file: &Path) -> Result<String, PromtoolError> {
        self.run(Operation::Check, file, None).await
    }

    async fn test(&self, file: &Path, workdir: &Path) -> Result<String, PromtoolError> {
        self.run(Operation::Test, file, Some(workdir)).await
    }
}
