//! Layered template variables
//!
//! Variables live in `*.vars` YAML files next to the templates. The
//! `default` layer is the base; a `<context>.vars` layer overrides it for one
//! context. Values are always text.

mod error;
mod set;
mod store;

pub use error::VarsError;
pub use set::{VARS_SUFFIX, VariableSet, compose};
pub use store::{CONTEXT_KEY, DEFAULT_LAYER, VariableStore};
