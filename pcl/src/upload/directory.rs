//! Filesystem-backed rule sink

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{RuleSink, SinkError};
use crate::rules::RuleDocument;

/// Rule sink storing each document as `<root>/<namespace>/<name>.json`
///
/// Resource versions are decimal integers that increase by one on every
/// write to the same object.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(?root, "DirectorySink::new: called");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the stored object
    pub fn object_path(&self, namespace: &str, name: &str) -> Result<PathBuf, SinkError> {
        check_segment(namespace)?;
        check_segment(name)?;
        Ok(self.root.join(namespace).join(format!("{}.json", name)))
    }

    async fn read(&self, path: &Path, namespace: &str, name: &str) -> Result<RuleDocument, SinkError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SinkError::NotFound {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                });
            }
            Err(source) => {
                return Err(SinkError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_slice(&data).map_err(|source| SinkError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn check_segment(segment: &str) -> Result<(), SinkError> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['/', '\\']) {
        return Err(SinkError::InvalidName(segment.to_string()));
    }
    Ok(())
}

fn encode(doc: &RuleDocument) -> Result<Vec<u8>, SinkError> {
    serde_json::to_vec_pretty(doc).map_err(|source| SinkError::Encode {
        name: doc.name().to_string(),
        source,
    })
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> SinkError + '_ {
    move |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[async_trait]
impl RuleSink for DirectorySink {
    async fn create(&self, doc: &RuleDocument) -> Result<RuleDocument, SinkError> {
        debug!(namespace = %doc.namespace(), name = %doc.name(), "DirectorySink::create: called");
        let path = self.object_path(doc.namespace(), doc.name())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_error(parent))?;
        }

        let mut stored = doc.clone();
        stored.set_resource_version(Some("1".to_string()));
        let data = encode(&stored)?;

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SinkError::AlreadyExists {
                    namespace: doc.namespace().to_string(),
                    name: doc.name().to_string(),
                });
            }
            Err(source) => return Err(SinkError::Io { path, source }),
        };
        file.write_all(&data).await.map_err(io_error(&path))?;
        file.flush().await.map_err(io_error(&path))?;

        debug!(?path, "DirectorySink::create: stored");
        Ok(stored)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<RuleDocument, SinkError> {
        debug!(%namespace, %name, "DirectorySink::get: called");
        let path = self.object_path(namespace, name)?;
        self.read(&path, namespace, name).await
    }

    async fn update(&self, doc: &RuleDocument) -> Result<RuleDocument, SinkError> {
        debug!(namespace = %doc.namespace(), name = %doc.name(), "DirectorySink::update: called");
        let path = self.object_path(doc.namespace(), doc.name())?;
        let current = self.read(&path, doc.namespace(), doc.name()).await?;
        let stored_version = current.resource_version().unwrap_or_default().to_string();

        let presented = doc
            .resource_version()
            .ok_or_else(|| SinkError::MissingResourceVersion {
                namespace: doc.namespace().to_string(),
                name: doc.name().to_string(),
            })?;
        if presented != stored_version {
            return Err(SinkError::Conflict {
                namespace: doc.namespace().to_string(),
                name: doc.name().to_string(),
                presented: presented.to_string(),
                stored: stored_version,
            });
        }

        let next = stored_version.parse::<u64>().unwrap_or(0) + 1;
        let mut stored = doc.clone();
        stored.set_resource_version(Some(next.to_string()));

        // Staged write, then rename over the object
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, encode(&stored)?)
            .await
            .map_err(io_error(&staging))?;
        tokio::fs::rename(&staging, &path).await.map_err(io_error(&path))?;

        debug!(?path, version = next, "DirectorySink::update: stored");
        Ok(stored)
    }
}
