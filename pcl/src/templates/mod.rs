//! Rule template parsing and per-context expansion
//!
//! Templates use `<{[ … ]}>` as their action delimiters so that the `{{ … }}`
//! braces of Prometheus alert templating pass through untouched. Every
//! context is expanded into its own freshly created directory under an
//! explicitly configured output root.

mod engine;
mod error;
mod set;

pub use engine::{
    DEFAULT_OUTPUT_ROOT, ExpansionConfig, ExpansionEngine, ExpansionResult, Expansions, FIXTURE_DIR, SourceDir,
};
pub use error::{ExpandError, ExpansionFailure, TemplateError};
pub use set::{CLOSE_DELIM, OPEN_DELIM, TEMPLATE_PATTERN, TemplateSet};
