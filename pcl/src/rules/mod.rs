//! Prometheus rule files and `PrometheusRule` documents
//!
//! Rendered rule files are decoded into a typed group/rule model where every
//! rule is exactly one of a recording rule or an alerting rule, then wrapped
//! in a `PrometheusRule` document whose name is derived from the file name.

mod document;
mod error;
mod loader;
mod model;
mod name;

pub use document::{
    API_VERSION, KIND, LIST_KIND, ObjectMeta, ROLE_LABEL, ROLE_RULEFILES, RuleDocument, RuleList, TARGET_LABEL,
};
pub use error::{RuleError, RuleKindError, SpecError};
pub use loader::{LoadReport, RULE_FILE_PATTERN, load_directory, load_file};
pub use model::{AlertRule, RecordRule, Rule, RuleGroup, RuleGroupSpec, parse_rule_spec};
pub use name::{RULE_FILE_SUFFIX, derive_name};
