//! In-memory rule sink

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::{RuleSink, SinkError};
use crate::rules::RuleDocument;

#[derive(Debug, Default)]
struct Store {
    objects: BTreeMap<(String, String), RuleDocument>,
    next_version: u64,
}

/// Rule sink holding documents in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    store: Mutex<Store>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored documents in (namespace, name) order
    pub fn documents(&self) -> Vec<RuleDocument> {
        self.lock().objects.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Store {
    fn bump(&mut self) -> String {
        self.next_version += 1;
        self.next_version.to_string()
    }
}

fn key(doc: &RuleDocument) -> (String, String) {
    (doc.namespace().to_string(), doc.name().to_string())
}

#[async_trait]
impl RuleSink for MemorySink {
    async fn create(&self, doc: &RuleDocument) -> Result<RuleDocument, SinkError> {
        debug!(namespace = %doc.namespace(), name = %doc.name(), "MemorySink::create: called");
        let mut store = self.lock();
        let key = key(doc);
        if store.objects.contains_key(&key) {
            return Err(SinkError::AlreadyExists {
                namespace: key.0,
                name: key.1,
            });
        }

        let mut stored = doc.clone();
        stored.set_resource_version(Some(store.bump()));
        store.objects.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get(&self, namespace: &str, name: &str) -> Result<RuleDocument, SinkError> {
        debug!(%namespace, %name, "MemorySink::get: called");
        self.lock()
            .objects
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SinkError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    async fn update(&self, doc: &RuleDocument) -> Result<RuleDocument, SinkError> {
        debug!(namespace = %doc.namespace(), name = %doc.name(), "MemorySink::update: called");
        let mut store = self.lock();
        let key = key(doc);

        let current = match store.objects.get(&key) {
            Some(current) => current.resource_version().unwrap_or_default().to_string(),
            None => {
                return Err(SinkError::NotFound {
                    namespace: key.0,
                    name: key.1,
                });
            }
        };
        let presented = match doc.resource_version() {
            Some(v) => v.to_string(),
            None => {
                return Err(SinkError::MissingResourceVersion {
                    namespace: key.0,
                    name: key.1,
                });
            }
        };
        if presented != current {
            return Err(SinkError::Conflict {
                namespace: key.0,
                name: key.1,
                presented,
                stored: current,
            });
        }

        let mut stored = doc.clone();
        stored.set_resource_version(Some(store.bump()));
        store.objects.insert(key, stored.clone());
        Ok(stored)
    }
}
