//! Uploading rule documents
//!
//! A [`RuleSink`] is an object store for `PrometheusRule` documents with
//! optimistic concurrency: every stored document carries a resource version,
//! and an update must present the version it replaces.

mod directory;
mod error;
mod memory;
mod sink;

pub use directory::DirectorySink;
pub use error::SinkError;
pub use memory::MemorySink;
pub use sink::{RuleSink, UploadSummary, upload};
