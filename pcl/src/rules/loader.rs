//! Loading rule files into documents

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{RuleDocument, RuleError, derive_name, parse_rule_spec};
use crate::paths::matching_files;

/// Glob for rule files in an expanded context directory
pub const RULE_FILE_PATTERN: &str = "*.yaml";

/// Outcome of loading a directory of rule files
///
/// Files that fail to load are skipped; the documents of every other file
/// are still returned.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully loaded documents, in file-name order
    pub documents: Vec<RuleDocument>,
    /// Files that failed, in file-name order
    pub failures: Vec<(PathBuf, RuleError)>,
}

impl LoadReport {
    /// True when every file loaded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Error of the last file that failed
    pub fn last_error(&self) -> Option<&RuleError> {
        self.failures.last().map(|(_, e)| e)
    }

    /// Split into documents and the most recent error, if any
    pub fn into_parts(self) -> (Vec<RuleDocument>, Option<RuleError>) {
        let last = self.failures.into_iter().next_back().map(|(_, e)| e);
        (self.documents, last)
    }
}

/// Load one rule file as a `PrometheusRule` document
pub fn load_file(path: impl AsRef<Path>, namespace: &str, target: &str) -> Result<RuleDocument, RuleError> {
    let path = path.as_ref();
    debug!(?path, %namespace, %target, "load_file: called");

    let data = fs::read(path).map_err(|source| RuleError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let spec = parse_rule_spec(&data).map_err(|source| RuleError::Spec {
        path: path.to_path_buf(),
        source,
    })?;

    let name = derive_name(path, target);
    debug!(%name, groups = spec.groups.len(), "load_file: loaded");
    Ok(RuleDocument::new(name, namespace, target, spec))
}

/// Load every top-level `*.yaml` in `dir`
///
/// Fails only when the directory holds no rule files at all (including when
/// it cannot be listed). Per-file failures are collected in the report.
pub fn load_directory(dir: impl AsRef<Path>, namespace: &str, target: &str) -> Result<LoadReport, RuleError> {
    let dir = dir.as_ref();
    debug!(?dir, %namespace, %target, "load_directory: called");

    let files = matching_files(dir, RULE_FILE_PATTERN).map_err(|source| RuleError::Pattern {
        dir: dir.to_path_buf(),
        source,
    })?;
    if files.is_empty() {
        debug!(?dir, "load_directory: no rule files");
        return Err(RuleError::NoRuleFiles { dir: dir.to_path_buf() });
    }

    let mut report = LoadReport::default();
    for file in files {
        match load_file(&file, namespace, target) {
            Ok(doc) => report.documents.push(doc),
            Err(e) => {
                warn!("Skipping rule file {}: {}", file.display(), e);
                report.failures.push((file, e));
            }
        }
    }

    info!(
        "Loaded {} rule document(s) from {} ({} failed)",
        report.documents.len(),
        dir.display(),
        report.failures.len()
    );
    Ok(report)
}
