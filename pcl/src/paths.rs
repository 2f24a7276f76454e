//! Directory scanning helpers shared by the loaders

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// List regular files directly inside `dir` whose names match `pattern`.
///
/// The directory part is escaped so glob metacharacters in it are taken
/// literally; only `pattern` is interpreted. Results are sorted by path.
pub(crate) fn matching_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, glob::PatternError> {
    let full = Path::new(&glob::Pattern::escape(&dir.to_string_lossy())).join(pattern);
    let full = full.to_string_lossy();
    debug!(%full, "matching_files: called");

    let mut files = Vec::new();
    for entry in glob::glob(&full)? {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(path) => debug!(?path, "matching_files: skipping non-file entry"),
            Err(e) => warn!(error = %e, "Unreadable entry while scanning {}", dir.display()),
        }
    }
    files.sort();

    debug!(count = files.len(), "matching_files: done");
    Ok(files)
}

/// Base file name as a `String` (lossy), or empty if the path has none
pub(crate) fn base_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_matching_files_is_top_level_and_sorted() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("b.yaml"), "").unwrap();
        fs::write(temp.path().join("a.yaml"), "").unwrap();
        fs::write(temp.path().join("c.vars"), "").unwrap();
        fs::create_dir(temp.path().join("tests")).unwrap();
        fs::write(temp.path().join("tests").join("d.yaml"), "").unwrap();

        let files = matching_files(temp.path(), "*.yaml").unwrap();
        let names: Vec<String> = files.iter().map(|p| base_name(p)).collect();
        assert_eq!(names, vec!["a.yaml", "b.yaml"]);
    }

    #[test]
    fn test_matching_files_escapes_directory() {
        let temp = tempdir().unwrap();
        let odd = temp.path().join("rules[prod]");
        fs::create_dir(&odd).unwrap();
        fs::write(odd.join("x.yaml"), "").unwrap();

        let files = matching_files(&odd, "*.yaml").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_matching_files_missing_directory_is_empty() {
        let temp = tempdir().unwrap();
        let files = matching_files(&temp.path().join("nope"), "*.yaml").unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/tmp/blah.yaml")), "blah.yaml");
        assert_eq!(base_name(Path::new("/")), "");
    }
}
