//! RuleSink trait and create-or-update upload

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::SinkError;
use crate::rules::RuleDocument;

/// Object store for rule documents
#[async_trait]
pub trait RuleSink: Send + Sync {
    /// Store a new document; fails with [`SinkError::AlreadyExists`] if present
    async fn create(&self, doc: &RuleDocument) -> Result<RuleDocument, SinkError>;

    /// Fetch the stored document
    async fn get(&self, namespace: &str, name: &str) -> Result<RuleDocument, SinkError>;

    /// Replace a stored document
    ///
    /// `doc` must carry the resource version of the object it replaces.
    async fn update(&self, doc: &RuleDocument) -> Result<RuleDocument, SinkError>;
}

/// Names of documents created and updated by an upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub created: Vec<String>,
    pub updated: Vec<String>,
}

impl UploadSummary {
    pub fn total(&self) -> usize {
        self.created.len() + self.updated.len()
    }
}

/// Create each document, or update it from the stored version if it exists
///
/// Documents are handled in order and the first failure stops the upload.
pub async fn upload(
    sink: &dyn RuleSink,
    documents: Vec<RuleDocument>,
    namespace: &str,
    target: &str,
) -> Result<UploadSummary, SinkError> {
    debug!(count = documents.len(), %namespace, %target, "upload: called");
    let mut summary = UploadSummary::default();

    for mut doc in documents {
        match sink.create(&doc).await {
            Ok(_) => {
                debug!(name = %doc.name(), "upload: created");
                summary.created.push(doc.name().to_string());
            }
            Err(e) if e.is_already_exists() => {
                let existing = sink.get(namespace, doc.name()).await?;
                doc.set_resource_version(existing.resource_version().map(str::to_string));

                if let Err(e) = sink.update(&doc).await {
                    warn!(
                        "Failed to update {}/{}\nExisting:\n{}\n\nNew:\n{}",
                        namespace,
                        doc.name(),
                        serde_json::to_string_pretty(&existing).unwrap_or_default(),
                        serde_json::to_string_pretty(&doc).unwrap_or_default()
                    );
                    return Err(e);
                }
                debug!(name = %doc.name(), "upload: updated");
                summary.updated.push(doc.name().to_string());
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "Uploaded {} rule document(s) for {} to {} ({} created, {} updated)",
        summary.total(),
        target,
        namespace,
        summary.created.len(),
        summary.updated.len()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{RuleGroupSpec, parse_rule_spec};
    use crate::upload::MemorySink;

    fn doc(name: &str, group: &str) -> RuleDocument {
        let yaml = format!("groups:\n- name: {group}\n  rules:\n  - record: r\n    expr: up\n");
        let spec: RuleGroupSpec = parse_rule_spec(yaml.as_bytes()).unwrap();
        RuleDocument::new(name, "monitoring", "k8s", spec)
    }

    #[tokio::test]
    async fn test_upload_creates_then_updates() {
        let sink = MemorySink::new();

        let first = upload(&sink, vec![doc("k8s-a-rules", "v1")], "monitoring", "k8s")
            .await
            .unwrap();
        assert_eq!(first.created, ["k8s-a-rules"]);
        assert!(first.updated.is_empty());

        let second = upload(
            &sink,
            vec![doc("k8s-a-rules", "v2"), doc("k8s-b-rules", "v1")],
            "monitoring",
            "k8s",
        )
        .await
        .unwrap();
        assert_eq!(second.updated, ["k8s-a-rules"]);
        assert_eq!(second.created, ["k8s-b-rules"]);

        let stored = sink.get("monitoring", "k8s-a-rules").await.unwrap();
        assert_eq!(stored.spec.groups[0].name, "v2");
        assert_eq!(stored.resource_version(), Some("2"));
    }

    struct RejectingSink;

    #[async_trait]
    impl RuleSink for RejectingSink {
        async fn create(&self, _doc: &RuleDocument) -> Result<RuleDocument, SinkError> {
            Err(SinkError::InvalidName("rejected".to_string()))
        }

        async fn get(&self, namespace: &str, name: &str) -> Result<RuleDocument, SinkError> {
            Err(SinkError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
        }

        async fn update(&self, _doc: &RuleDocument) -> Result<RuleDocument, SinkError> {
            unreachable!("update must not follow a non-conflict create failure")
        }
    }

    #[tokio::test]
    async fn test_upload_propagates_other_create_errors() {
        let err = upload(&RejectingSink, vec![doc("k8s-a-rules", "g")], "monitoring", "k8s")
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::InvalidName(_)));
    }
}
