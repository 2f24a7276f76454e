//! Rule validation with `promtool`
//!
//! Rendered rule files are syntax-checked with `promtool check rules` and
//! unit-tested with `promtool test rules`. The [`RuleChecker`] trait is the
//! seam the pipeline drives, so checks can be swapped out in tests.

pub mod checker;
mod error;
mod runner;

pub use checker::RuleChecker;
pub use error::{FailureCause, Operation, PromtoolError};
pub use runner::{EXECUTABLE_NAMES, Promtool};
