//! RuleChecker trait definition

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{Operation, PromtoolError};
use crate::paths::matching_files;
use crate::templates::TEMPLATE_PATTERN;

/// Validates rendered rule files
#[async_trait]
pub trait RuleChecker: Send + Sync {
    /// Syntax-check one rule file, returning the tool's output
    async fn check(&self, file: &Path) -> Result<String, PromtoolError>;

    /// Run one unit-test file with `workdir` as working directory
    ///
    /// Rule files referenced by the test are resolved relative to `workdir`.
    async fn test(&self, file: &Path, workdir: &Path) -> Result<String, PromtoolError>;

    /// Syntax-check every top-level `*.yaml` in `dir`, stopping at the first failure
    async fn check_directory(&self, dir: &Path) -> Result<Vec<String>, PromtoolError> {
        debug!(?dir, "RuleChecker::check_directory: called");
        let mut outputs = Vec::new();
        for file in files_for(dir, Operation::Check)? {
            outputs.push(self.check(&file).await?);
        }
        info!("Checked {} rule file(s) in {}", outputs.len(), dir.display());
        Ok(outputs)
    }

    /// Run every top-level `*.yaml` in `dir` as a unit test from `workdir`
    ///
    /// A relative `dir` is resolved against `workdir`; an absolute one is used as is.
    async fn test_directory(&self, dir: &Path, workdir: &Path) -> Result<Vec<String>, PromtoolError> {
        debug!(?dir, ?workdir, "RuleChecker::test_directory: called");
        let dir = workdir.join(dir);
        let mut outputs = Vec::new();
        for file in files_for(&dir, Operation::Test)? {
            outputs.push(self.test(&file, workdir).await?);
        }
        info!("Ran {} unit test file(s) in {}", outputs.len(), dir.display());
        Ok(outputs)
    }
}

fn files_for(dir: &Path, operation: Operation) -> Result<Vec<std::path::PathBuf>, PromtoolError> {
    let files = matching_files(dir, TEMPLATE_PATTERN).map_err(|source| PromtoolError::Pattern {
        dir: dir.to_path_buf(),
        source,
    })?;
    if files.is_empty() {
        return Err(PromtoolError::NoFiles {
            operation,
            dir: dir.to_path_buf(),
        });
    }
    Ok(files)
}
