//! End-to-end run: expand, check, test, load and upload
//!
//! The unit-test context is always expanded first. Every rendered file of
//! every context is syntax-checked, the unit-test context's fixtures are run
//! as promtool unit tests, and then every other context's rules are loaded
//! and uploaded (or printed on a dry run).

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use tracing::{debug, error, info, warn};

use crate::promtool::RuleChecker;
use crate::rules::{RuleList, load_directory};
use crate::templates::{ExpansionEngine, ExpansionResult, Expansions};
use crate::upload::{RuleSink, UploadSummary, upload};

/// Options for a single run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory holding templates, vars files and `tests/`
    pub source_dir: PathBuf,
    /// Contexts to expand and upload, in order
    pub contexts: Vec<String>,
    /// Context used for unit tests only
    pub unit_test_context: String,
    /// Prometheus instance the documents target
    pub prometheus: String,
    /// Namespace the documents are created in
    pub namespace: String,
    /// Print documents instead of uploading them
    pub dry_run: bool,
    pub skip_syntax_check: bool,
    pub skip_unit_tests: bool,
    /// Leave expansion output on disk
    pub keep_output: bool,
}

impl RunOptions {
    /// Contexts in expansion order: unit-test context first, duplicates removed
    pub fn expansion_order(&self) -> Vec<String> {
        let mut order = vec![self.unit_test_context.clone()];
        for context in &self.contexts {
            if !order.contains(context) {
                order.push(context.clone());
            }
        }
        order
    }
}

/// What happened to one context after checks passed
#[derive(Debug, Clone)]
pub enum ContextOutcome {
    /// The unit-test context is never uploaded
    UnitTestOnly,
    /// Documents printed instead of uploaded
    DryRun(RuleList),
    Uploaded(UploadSummary),
    /// Rule loading failed; nothing was uploaded for this context
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct ContextReport {
    pub context: String,
    pub directory: PathBuf,
    pub outcome: ContextOutcome,
}

/// Result of a completed run, one entry per context in expansion order
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub contexts: Vec<ContextReport>,
    pub files_checked: usize,
    pub tests_run: usize,
}

impl RunReport {
    /// Contexts whose upload was skipped
    pub fn skipped(&self) -> impl Iterator<Item = &ContextReport> {
        self.contexts
            .iter()
            .filter(|c| matches!(c.outcome, ContextOutcome::Skipped(_)))
    }
}

/// Drives a run against a rule checker and a rule sink
pub struct Pipeline {
    engine: ExpansionEngine,
    checker: Option<Arc<dyn RuleChecker>>,
    sink: Option<Arc<dyn RuleSink>>,
}

impl Pipeline {
    pub fn new(engine: ExpansionEngine) -> Self {
        debug!(output_root = ?engine.output_root(), "Pipeline::new: called");
        Self {
            engine,
            checker: None,
            sink: None,
        }
    }

    /// Checker used for syntax checks and unit tests
    pub fn with_checker(mut self, checker: Arc<dyn RuleChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Sink documents are uploaded to when not on a dry run
    pub fn with_sink(mut self, sink: Arc<dyn RuleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Run every stage; expansion output is removed afterwards unless kept
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        debug!(?options, "Pipeline::run: called");
        let order = options.expansion_order();

        info!("About to template-expand {}", options.source_dir.display());
        let expansions = match self.engine.expand_all(&order, &options.source_dir) {
            Ok(expansions) => expansions,
            Err(failure) => {
                finish(&failure.completed, options.keep_output);
                return Err(failure.error).context("Failed to expand templates");
            }
        };

        let outcome = self.process(options, &order, &expansions).await;
        finish(&expansions, options.keep_output);
        outcome
    }

    async fn process(&self, options: &RunOptions, order: &[String], expansions: &Expansions) -> Result<RunReport> {
        let results: Vec<&ExpansionResult> = order.iter().filter_map(|c| expansions.get(c)).collect();
        let mut report = RunReport::default();

        if options.skip_syntax_check {
            warn!("Syntax-checking is disabled");
        } else {
            report.files_checked = self.syntax_check(&results).await?;
        }

        if options.skip_unit_tests {
            warn!("Unit-testing is disabled");
        } else if let Some(unit) = expansions.get(&options.unit_test_context) {
            report.tests_run = self.unit_test(unit).await?;
        }

        for result in results {
            let outcome = if result.context() == options.unit_test_context {
                ContextOutcome::UnitTestOnly
            } else {
                self.publish(options, result).await?
            };
            report.contexts.push(ContextReport {
                context: result.context().to_string(),
                directory: result.directory().to_path_buf(),
                outcome,
            });
        }

        Ok(report)
    }

    fn checker(&self) -> Result<&dyn RuleChecker> {
        self.checker
            .as_deref()
            .ok_or_else(|| eyre::eyre!("No rule checker configured (is promtool installed?)"))
    }

    async fn syntax_check(&self, results: &[&ExpansionResult]) -> Result<usize> {
        let checker = self.checker()?;
        let mut checked = 0;

        for result in results {
            info!("Syntax-checking context {} (dir {})", result.context(), result.directory().display());
            for file in result.rendered() {
                let path = result.path_of(file);
                checker
                    .check(&path)
                    .await
                    .wrap_err_with(|| format!("Syntax check failed for context {}", result.context()))?;
                checked += 1;
            }
        }

        Ok(checked)
    }

    async fn unit_test(&self, result: &ExpansionResult) -> Result<usize> {
        let checker = self.checker()?;
        let mut run = 0;

        info!("Unit-testing context {} (dir {})", result.context(), result.directory().display());
        for file in result.fixtures() {
            let path = result.path_of(file);
            checker
                .test(&path, result.directory())
                .await
                .wrap_err_with(|| format!("Unit tests failed for context {}", result.context()))?;
            run += 1;
        }

        Ok(run)
    }

    async fn publish(&self, options: &RunOptions, result: &ExpansionResult) -> Result<ContextOutcome> {
        let context = result.context();
        let directory = result.directory();

        let loaded = load_directory(directory, &options.namespace, &options.prometheus)
            .map(|report| report.into_parts());
        let documents = match loaded {
            Ok((documents, None)) => documents,
            Ok((_, Some(e))) | Err(e) => {
                error!(
                    "Failed to load prometheus rules for context {} from directory {}: {}",
                    context,
                    directory.display(),
                    e
                );
                return Ok(ContextOutcome::Skipped(e.to_string()));
            }
        };

        if options.dry_run {
            info!("Dry-run enabled, emitting loaded rules for context {}", context);
            return Ok(ContextOutcome::DryRun(RuleList::new(documents)));
        }

        let sink = self
            .sink
            .as_deref()
            .ok_or_else(|| eyre::eyre!("No upload target configured for context {}", context))?;
        let summary = upload(sink, documents, &options.namespace, &options.prometheus)
            .await
            .wrap_err_with(|| format!("Failed to create or update rules for context {}", context))?;

        Ok(ContextOutcome::Uploaded(summary))
    }
}

/// Remove expansion output, or log where it was kept
fn finish(expansions: &Expansions, keep_output: bool) {
    if keep_output {
        for result in expansions.iter() {
            info!("Keeping output for {} at {}", result.context(), result.directory().display());
        }
    } else if let Err(e) = expansions.dispose_all() {
        warn!("Failed to remove expansion output: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promtool::checker::mock::MockChecker;
    use crate::templates::ExpansionConfig;
    use crate::upload::MemorySink;
    use std::fs;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    const RULES: &str = "groups:\n- name: <{[ context ]}>\n  rules:\n  - alert: Down\n    expr: up == 0\n    for: <{[ pending ]}>\n";

    fn source() -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("node.yaml"), RULES).unwrap();
        fs::write(dir.path().join("default.vars"), "pending: 5m\n").unwrap();
        fs::write(dir.path().join("prod.vars"), "pending: 1m\n").unwrap();
        fs::create_dir(dir.path().join("tests")).unwrap();
        fs::write(dir.path().join("tests").join("node_test.yaml"), "rule_files: [node.yaml]\n").unwrap();
        dir
    }

    fn options(source: &Path, contexts: &[&str]) -> RunOptions {
        RunOptions {
            source_dir: source.to_path_buf(),
            contexts: contexts.iter().map(|c| c.to_string()).collect(),
            unit_test_context: "unittest".to_string(),
            prometheus: "k8s".to_string(),
            namespace: "monitoring".to_string(),
            dry_run: false,
            skip_syntax_check: false,
            skip_unit_tests: false,
            keep_output: false,
        }
    }

    fn engine(out: &Path) -> ExpansionEngine {
        ExpansionEngine::new(ExpansionConfig::with_root(out))
    }

    #[test]
    fn test_expansion_order_puts_unit_test_first() {
        let opts = options(Path::new("/src"), &["prod", "unittest", "staging", "prod"]);
        assert_eq!(opts.expansion_order(), ["unittest", "prod", "staging"]);
    }

    #[tokio::test]
    async fn test_run_checks_tests_and_uploads() {
        let src = source();
        let out = tempdir().unwrap();
        let checker = Arc::new(MockChecker::new());
        let sink = Arc::new(MemorySink::new());

        let pipeline = Pipeline::new(engine(out.path()))
            .with_checker(checker.clone())
            .with_sink(sink.clone());
        let report = pipeline.run(&options(src.path(), &["prod", "staging"])).await.unwrap();

        // node.yaml for each of unittest, prod, staging
        assert_eq!(report.files_checked, 3);
        assert_eq!(report.tests_run, 1);
        assert_eq!(checker.checked().len(), 3);

        let tested = checker.tested();
        assert_eq!(tested.len(), 1);
        assert!(tested[0].0.ends_with("tests/node_test.yaml"));
        assert!(base_of(&tested[0].1).starts_with("tmp-unittest-"));

        let contexts: Vec<_> = report.contexts.iter().map(|c| c.context.as_str()).collect();
        assert_eq!(contexts, ["unittest", "prod", "staging"]);
        assert!(matches!(report.contexts[0].outcome, ContextOutcome::UnitTestOnly));

        // Same document name for both contexts: staging updates what prod created
        let docs = sink.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].name(), "k8s-node-rules");
        assert_eq!(docs[0].spec.groups[0].name, "staging");

        // Output removed unless kept
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    fn base_of(path: &Path) -> String {
        path.file_name().unwrap().to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_dry_run_emits_documents() {
        let src = source();
        let out = tempdir().unwrap();
        let mut opts = options(src.path(), &["prod"]);
        opts.dry_run = true;
        opts.keep_output = true;

        let pipeline = Pipeline::new(engine(out.path())).with_checker(Arc::new(MockChecker::new()));
        let report = pipeline.run(&opts).await.unwrap();

        match &report.contexts[1].outcome {
            ContextOutcome::DryRun(list) => {
                assert_eq!(list.items.len(), 1);
                let json = serde_json::to_value(list).unwrap();
                assert_eq!(json["kind"], "PrometheusRuleList");
                assert_eq!(json["items"][0]["spec"]["groups"][0]["rules"][0]["for"], "1m");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // unittest and prod directories kept
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 2);
    }

    #[tokio::test]
    async fn test_syntax_failure_stops_run() {
        let src = source();
        let out = tempdir().unwrap();
        let sink = Arc::new(MemorySink::new());

        let pipeline = Pipeline::new(engine(out.path()))
            .with_checker(Arc::new(MockChecker::failing_on("node.yaml")))
            .with_sink(sink.clone());
        let err = pipeline.run(&options(src.path(), &["prod"])).await.unwrap_err();

        assert!(format!("{err:#}").contains("Syntax check failed for context unittest"));
        assert!(sink.is_empty());
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_expansion_failure_removes_completed_output() {
        let src = source();
        fs::write(src.path().join("extra.yaml"), "v: <{[ only_ut ]}>\n").unwrap();
        fs::write(src.path().join("unittest.vars"), "only_ut: yes\n").unwrap();
        let out = tempdir().unwrap();

        let pipeline = Pipeline::new(engine(out.path())).with_checker(Arc::new(MockChecker::new()));
        let err = pipeline.run(&options(src.path(), &["prod"])).await.unwrap_err();

        let msg = format!("{err:#}");
        assert!(msg.contains("Failed to expand templates"), "{msg}");
        assert!(msg.contains("prod"), "{msg}");
        // unittest expanded before prod failed; its directory must not leak
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_expansion_failure_keeps_completed_output_when_asked() {
        let src = source();
        fs::write(src.path().join("extra.yaml"), "v: <{[ only_ut ]}>\n").unwrap();
        fs::write(src.path().join("unittest.vars"), "only_ut: yes\n").unwrap();
        let out = tempdir().unwrap();
        let mut opts = options(src.path(), &["prod"]);
        opts.keep_output = true;

        let pipeline = Pipeline::new(engine(out.path())).with_checker(Arc::new(MockChecker::new()));
        assert!(pipeline.run(&opts).await.is_err());

        let kept: Vec<String> = fs::read_dir(out.path())
            .unwrap()
            .map(|e| base_of(&e.unwrap().path()))
            .collect();
        assert_eq!(kept.len(), 1);
        assert!(kept[0].starts_with("tmp-unittest-"));
    }

    #[tokio::test]
    async fn test_skipped_checks_need_no_checker() {
        let src = source();
        let out = tempdir().unwrap();
        let mut opts = options(src.path(), &["prod"]);
        opts.skip_syntax_check = true;
        opts.skip_unit_tests = true;

        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(engine(out.path())).with_sink(sink.clone());
        let report = pipeline.run(&opts).await.unwrap();

        assert_eq!(report.files_checked, 0);
        assert_eq!(report.tests_run, 0);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_checker_is_error() {
        let src = source();
        let out = tempdir().unwrap();
        let pipeline = Pipeline::new(engine(out.path()));
        assert!(pipeline.run(&options(src.path(), &["prod"])).await.is_err());
    }

    #[tokio::test]
    async fn test_bad_rule_file_skips_context_upload() {
        let src = source();
        fs::write(src.path().join("broken.yaml"), "groups: []\n").unwrap();
        let out = tempdir().unwrap();
        let mut opts = options(src.path(), &["prod"]);
        opts.skip_syntax_check = true;

        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(engine(out.path()))
            .with_checker(Arc::new(MockChecker::new()))
            .with_sink(sink.clone());
        let report = pipeline.run(&opts).await.unwrap();

        let skipped: Vec<_> = report.skipped().map(|c| c.context.as_str()).collect();
        assert_eq!(skipped, ["prod"]);
        assert!(sink.is_empty());
    }
}
