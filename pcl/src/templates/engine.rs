//! Per-context expansion into isolated output directories

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{ExpandError, ExpansionFailure, TemplateSet};
use crate::paths::{base_name, matching_files};
use crate::vars::VariableStore;

/// Subdirectory holding promtool unit tests, in both source and output
pub const FIXTURE_DIR: &str = "tests";

/// Default parent directory for expansion output
pub const DEFAULT_OUTPUT_ROOT: &str = "/tmp/prometheus-config-loader";

/// Configuration for the expansion engine
#[derive(Debug, Clone)]
pub struct ExpansionConfig {
    /// Parent directory under which each context gets its own directory
    pub output_root: PathBuf,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        debug!("ExpansionConfig::default: called");
        Self {
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
        }
    }
}

impl ExpansionConfig {
    /// Create config with the given output root
    pub fn with_root(output_root: impl Into<PathBuf>) -> Self {
        let output_root = output_root.into();
        debug!(?output_root, "ExpansionConfig::with_root: called");
        Self { output_root }
    }
}

/// A parsed source directory: templates plus variable layers
#[derive(Debug)]
pub struct SourceDir {
    dir: PathBuf,
    templates: TemplateSet,
    variables: VariableStore,
}

impl SourceDir {
    /// Parse all templates and variable layers in `dir`
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ExpandError> {
        let dir = dir.as_ref();
        debug!(?dir, "SourceDir::load: called");
        let variables = VariableStore::load_dir(dir)?;
        let templates = TemplateSet::load_dir(dir)?;
        Ok(Self::new(dir, templates, variables))
    }

    /// Assemble a source from parts already in memory
    pub fn new(dir: impl Into<PathBuf>, templates: TemplateSet, variables: VariableStore) -> Self {
        Self {
            dir: dir.into(),
            templates,
            variables,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    fn fixture_dir(&self) -> PathBuf {
        self.dir.join(FIXTURE_DIR)
    }
}

/// Output of expanding one context
///
/// The directory stays on disk until [`ExpansionResult::dispose`] is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpansionResult {
    /// Context this expansion is for
    context: String,
    /// Output directory owned by this expansion
    directory: PathBuf,
    /// Produced files relative to `directory`; fixtures live under `tests/`
    files: Vec<PathBuf>,
}

impl ExpansionResult {
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// All produced files, relative to the output directory, in creation order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Rendered rule files (everything outside `tests/`)
    pub fn rendered(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path).filter(|p| !p.starts_with(FIXTURE_DIR))
    }

    /// Copied fixture files (everything under `tests/`)
    pub fn fixtures(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path).filter(|p| p.starts_with(FIXTURE_DIR))
    }

    /// Absolute path of a produced file
    pub fn path_of(&self, relative: &Path) -> PathBuf {
        self.directory.join(relative)
    }

    /// Remove the output directory tree
    ///
    /// Safe to call more than once; an already removed directory is not an error.
    pub fn dispose(&self) -> io::Result<()> {
        debug!(context = %self.context, directory = ?self.directory, "ExpansionResult::dispose: called");
        match fs::remove_dir_all(&self.directory) {
            Ok(()) => {
                info!("Removed expansion output {} for {}", self.directory.display(), self.context);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("ExpansionResult::dispose: already removed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Expansion results keyed by context
#[derive(Debug, Clone, Default)]
pub struct Expansions {
    results: BTreeMap<String, ExpansionResult>,
}

impl Expansions {
    pub fn get(&self, context: &str) -> Option<&ExpansionResult> {
        self.results.get(context)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExpansionResult> {
        self.results.values()
    }

    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn insert(&mut self, result: ExpansionResult) {
        self.results.insert(result.context.clone(), result);
    }

    /// Dispose every result, attempting all of them; returns the first failure
    pub fn dispose_all(&self) -> io::Result<()> {
        debug!(count = self.results.len(), "Expansions::dispose_all: called");
        let mut first_err = None;
        for result in self.results.values() {
            if let Err(e) = result.dispose() {
                warn!("Failed to remove {}: {}", result.directory.display(), e);
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

/// Expands a source directory once per context
#[derive(Debug, Clone, Default)]
pub struct ExpansionEngine {
    config: ExpansionConfig,
}

impl ExpansionEngine {
    /// Create a new expansion engine
    pub fn new(config: ExpansionConfig) -> Self {
        debug!(?config, "ExpansionEngine::new: called");
        Self { config }
    }

    pub fn output_root(&self) -> &Path {
        &self.config.output_root
    }

    /// Expand `source_dir` for every context, in order
    ///
    /// Templates and variables are parsed once. The first failing context
    /// stops the run; the contexts already expanded are returned in the
    /// [`ExpansionFailure`] and their directories are left on disk for the
    /// caller to dispose or keep.
    pub fn expand_all(
        &self,
        contexts: &[String],
        source_dir: impl AsRef<Path>,
    ) -> Result<Expansions, ExpansionFailure> {
        let source_dir = source_dir.as_ref();
        debug!(?contexts, ?source_dir, "ExpansionEngine::expand_all: called");
        let source = SourceDir::load(source_dir)?;

        let mut expansions = Expansions::default();
        for context in contexts {
            if expansions.get(context).is_some() {
                warn!("Context {} listed more than once, expanding it once", context);
                continue;
            }
            match self.expand_context(context, &source) {
                Ok(result) => expansions.insert(result),
                Err(error) => {
                    warn!(
                        "Expansion stopped at context {} after {} completed context(s)",
                        context,
                        expansions.len()
                    );
                    return Err(ExpansionFailure {
                        completed: expansions,
                        error,
                    });
                }
            }
        }

        info!("Expanded {} for {} context(s)", source_dir.display(), expansions.len());
        Ok(expansions)
    }

    /// Expand a parsed source for a single context
    ///
    /// On failure the context's partially written directory is removed.
    pub fn expand_context(&self, context: &str, source: &SourceDir) -> Result<ExpansionResult, ExpandError> {
        debug!(%context, "ExpansionEngine::expand_context: called");
        validate_context(context)?;

        let directory = self.allocate_directory(context)?;
        info!("Expanding {} for context {} into {}", source.dir().display(), context, directory.display());

        let mut result = ExpansionResult {
            context: context.to_string(),
            directory,
            files: Vec::new(),
        };

        if let Err(e) = self.populate(&mut result, source) {
            debug!(error = %e, "ExpansionEngine::expand_context: populate failed");
            if let Err(cleanup) = result.dispose() {
                warn!("Failed to remove partial output {}: {}", result.directory.display(), cleanup);
            }
            return Err(e);
        }

        debug!(count = result.files.len(), "ExpansionEngine::expand_context: done");
        Ok(result)
    }

    /// Create a fresh, uniquely named directory for a context
    fn allocate_directory(&self, context: &str) -> Result<PathBuf, ExpandError> {
        let root = &self.config.output_root;
        debug!(?root, %context, "ExpansionEngine::allocate_directory: called");
        let create_err = |source| ExpandError::CreateOutput {
            context: context.to_string(),
            root: root.clone(),
            source,
        };

        fs::create_dir_all(root).map_err(create_err)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("tmp-{}-", context))
            .tempdir_in(root)
            .map_err(create_err)?;

        // Lifetime is managed by ExpansionResult::dispose, not by drop
        Ok(dir.keep())
    }

    fn populate(&self, result: &mut ExpansionResult, source: &SourceDir) -> Result<(), ExpandError> {
        let context = result.context.clone();
        let vars = source.variables().for_context(&context);

        for name in source.templates().names() {
            let rendered = source
                .templates()
                .render(name, &vars)
                .map_err(|e| ExpandError::Render {
                    context: context.clone(),
                    template: name.clone(),
                    source: e,
                })?;

            let out_path = result.directory.join(name);
            fs::write(&out_path, rendered).map_err(|e| ExpandError::Write {
                context: context.clone(),
                path: out_path.clone(),
                source: e,
            })?;
            debug!(%name, "ExpansionEngine::populate: rendered template");
            result.files.push(PathBuf::from(name));
        }

        let out_fixtures = result.directory.join(FIXTURE_DIR);
        fs::create_dir_all(&out_fixtures).map_err(|e| ExpandError::Write {
            context: context.clone(),
            path: out_fixtures.clone(),
            source: e,
        })?;

        let fixture_dir = source.fixture_dir();
        let fixtures = matching_files(&fixture_dir, super::TEMPLATE_PATTERN).map_err(|e| ExpandError::FixturePattern {
            dir: fixture_dir.clone(),
            source: e,
        })?;

        for fixture in fixtures {
            let name = base_name(&fixture);
            fs::copy(&fixture, out_fixtures.join(&name)).map_err(|e| ExpandError::CopyFixture {
                context: context.clone(),
                file: fixture.clone(),
                source: e,
            })?;
            debug!(%name, "ExpansionEngine::populate: copied fixture");
            result.files.push(Path::new(FIXTURE_DIR).join(name));
        }

        Ok(())
    }
}

/// Context names become part of a directory name
fn validate_context(context: &str) -> Result<(), ExpandError> {
    let reason = if context.is_empty() {
        Some("must not be empty")
    } else if context.contains(['/', '\\']) {
        Some("contains a path separator")
    } else if context == "." || context == ".." {
        Some("is a relative path component")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ExpandError::InvalidContext {
            context: context.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
