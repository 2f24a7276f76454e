//! promloader - Prometheus rule template expansion and loading
//!
//! Takes a directory of Prometheus rule templates plus per-context variable
//! files, expands the templates once per context into an isolated output
//! directory, checks and unit-tests the result with `promtool`, and turns the
//! rendered rule files into `PrometheusRule` documents for upload.
//!
//! # Source Directory Layout
//!
//! ```text
//! rules/
//! ├── default.vars        # base variable layer (optional)
//! ├── prod.vars           # per-context overrides (optional)
//! ├── node.yaml           # rule templates, `<{[ … ]}>` delimiters
//! └── tests/
//!     └── node_test.yaml  # promtool unit tests, copied verbatim
//! ```
//!
//! # Modules
//!
//! - [`vars`] - Layered variable files
//! - [`templates`] - Template parsing and per-context expansion
//! - [`rules`] - Rule file model, loading and document naming
//! - [`promtool`] - Syntax checks and unit tests via `promtool`
//! - [`upload`] - Rule sinks and create-or-update upload
//! - [`pipeline`] - The end-to-end run
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
mod paths;
pub mod pipeline;
pub mod promtool;
pub mod rules;
pub mod templates;
pub mod upload;
pub mod vars;

// Re-export commonly used types
pub use config::Config;
pub use pipeline::{Pipeline, RunOptions};
pub use promtool::{Promtool, PromtoolError, RuleChecker};
pub use rules::{
    AlertRule, LoadReport, RecordRule, Rule, RuleDocument, RuleError, RuleGroup, RuleGroupSpec, derive_name,
    load_directory, load_file, parse_rule_spec,
};
pub use templates::{
    ExpandError, ExpansionConfig, ExpansionEngine, ExpansionFailure, ExpansionResult, Expansions, FIXTURE_DIR,
    TemplateError, TemplateSet,
};
pub use upload::{DirectorySink, MemorySink, RuleSink, SinkError, upload};
pub use vars::{VariableSet, VariableStore, VarsError, compose};
