//! `PrometheusRule` custom resource documents

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::RuleGroupSpec;

/// API group/version of the Prometheus operator resources
pub const API_VERSION: &str = "monitoring.coreos.com/v1";

/// Resource kind of a single rule document
pub const KIND: &str = "PrometheusRule";

/// Resource kind of a list of rule documents
pub const LIST_KIND: &str = "PrometheusRuleList";

/// Label the operator uses to select rule files
pub const ROLE_LABEL: &str = "role";

pub const ROLE_RULEFILES: &str = "prometheus-rulefiles";

/// Label naming the Prometheus instance a document targets
pub const TARGET_LABEL: &str = "prometheus";

/// Object metadata carried by a rule document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Version token assigned by the store; absent until first stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// A `PrometheusRule` resource wrapping one rule file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDocument {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub spec: RuleGroupSpec,
}

impl RuleDocument {
    /// Build a document labelled for the operator and the target instance
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, target: &str, spec: RuleGroupSpec) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(ROLE_LABEL.to_string(), ROLE_RULEFILES.to_string());
        labels.insert(TARGET_LABEL.to_string(), target.to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: namespace.into(),
                labels,
                resource_version: None,
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn resource_version(&self) -> Option<&str> {
        self.metadata.resource_version.as_deref()
    }

    pub fn set_resource_version(&mut self, version: Option<String>) {
        self.metadata.resource_version = version;
    }
}

/// A list of rule documents, as printed by a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleList {
    pub api_version: String,
    pub kind: String,
    pub items: Vec<RuleDocument>,
}

impl RuleList {
    pub fn new(items: Vec<RuleDocument>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: LIST_KIND.to_string(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> RuleGroupSpec {
        RuleGroupSpec { groups: Vec::new() }
    }

    #[test]
    fn test_new_sets_type_and_labels() {
        let doc = RuleDocument::new("k8s-node-rules", "monitoring", "k8s", spec());

        assert_eq!(doc.api_version, API_VERSION);
        assert_eq!(doc.kind, KIND);
        assert_eq!(doc.name(), "k8s-node-rules");
        assert_eq!(doc.namespace(), "monitoring");
        assert_eq!(doc.metadata.labels.get("role").map(String::as_str), Some("prometheus-rulefiles"));
        assert_eq!(doc.metadata.labels.get("prometheus").map(String::as_str), Some("k8s"));
        assert!(doc.resource_version().is_none());
    }

    #[test]
    fn test_serialize_camel_case() {
        let mut doc = RuleDocument::new("n", "ns", "t", spec());
        doc.set_resource_version(Some("7".to_string()));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["apiVersion"], "monitoring.coreos.com/v1");
        assert_eq!(json["kind"], "PrometheusRule");
        assert_eq!(json["metadata"]["resourceVersion"], "7");

        let back: RuleDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_list_kind() {
        let list = RuleList::new(vec![RuleDocument::new("n", "ns", "t", spec())]);
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["kind"], "PrometheusRuleList");
        assert_eq!(json["items"].as_array().map(Vec::len), Some(1));
    }
}
