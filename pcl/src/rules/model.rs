//! Rule group model

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use super::{RuleKindError, SpecError};

/// Ordered list of rule groups, the payload of a `PrometheusRule`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroupSpec {
    pub groups: Vec<RuleGroup>,
}

/// A named group of rules sharing an evaluation interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroup {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// A recording rule or an alerting rule, never both
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Rule {
    Record(RecordRule),
    Alert(AlertRule),
}

/// Derives a new series from an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRule {
    pub record: String,
    pub expr: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Fires when a boolean expression holds for the pending duration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertRule {
    pub alert: String,
    pub expr: String,
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub pending: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Rule {
    /// Recorded series name or alert name
    pub fn name(&self) -> &str {
        match self {
            Self::Record(r) => &r.record,
            Self::Alert(a) => &a.alert,
        }
    }

    pub fn expr(&self) -> &str {
        match self {
            Self::Record(r) => &r.expr,
            Self::Alert(a) => &a.expr,
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Self::Alert(_))
    }
}

/// Rule as written in YAML, before its kind is decided
#[derive(Debug, Deserialize)]
struct RawRule {
    #[serde(default)]
    record: Option<String>,
    #[serde(default)]
    alert: Option<String>,
    expr: String,
    #[serde(default, rename = "for")]
    pending: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(default)]
    annotations: Option<BTreeMap<String, String>>,
}

impl TryFrom<RawRule> for Rule {
    type Error = RuleKindError;

    fn try_from(raw: RawRule) -> Result<Self, Self::Error> {
        // An empty name counts as unset
        let record = raw.record.filter(|s| !s.is_empty());
        let alert = raw.alert.filter(|s| !s.is_empty());
        let labels = raw.labels.unwrap_or_default();
        let annotations = raw.annotations.unwrap_or_default();

        match (record, alert) {
            (Some(record), Some(alert)) => Err(RuleKindError::Ambiguous { record, alert }),
            (None, None) => Err(RuleKindError::MissingKind),
            (Some(record), None) => {
                if raw.pending.is_some() || !annotations.is_empty() {
                    return Err(RuleKindError::RecordWithAlertFields { record });
                }
                Ok(Self::Record(RecordRule {
                    record,
                    expr: raw.expr,
                    labels,
                }))
            }
            (None, Some(alert)) => Ok(Self::Alert(AlertRule {
                alert,
                expr: raw.expr,
                pending: raw.pending,
                labels,
                annotations,
            })),
        }
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawRule::deserialize(deserializer)?;
        Rule::try_from(raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    name: String,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    rules: Option<Vec<RawRule>>,
}

#[derive(Debug, Deserialize)]
struct RawSpec {
    #[serde(default)]
    groups: Option<Vec<RawGroup>>,
}

/// Decode rule file content into a [`RuleGroupSpec`]
///
/// Every rule must be exactly one of record or alert, and a file without
/// any groups is rejected.
pub fn parse_rule_spec(data: &[u8]) -> Result<RuleGroupSpec, SpecError> {
    debug!(len = data.len(), "parse_rule_spec: called");
    if data.iter().all(u8::is_ascii_whitespace) {
        debug!("parse_rule_spec: empty file");
        return Err(SpecError::NoGroups);
    }
    let raw: Option<RawSpec> = serde_yaml::from_slice(data)?;
    let raw_groups = raw.and_then(|r| r.groups).unwrap_or_default();

    if raw_groups.is_empty() {
        debug!("parse_rule_spec: no groups");
        return Err(SpecError::NoGroups);
    }

    let mut groups = Vec::with_capacity(raw_groups.len());
    for raw_group in raw_groups {
        let mut rules = Vec::new();
        for (index, raw_rule) in raw_group.rules.unwrap_or_default().into_iter().enumerate() {
            let rule = Rule::try_from(raw_rule).map_err(|source| SpecError::InvalidRule {
                group: raw_group.name.clone(),
                index,
                source,
            })?;
            rules.push(rule);
        }
        groups.push(RuleGroup {
            name: raw_group.name,
            interval: raw_group.interval,
            rules,
        });
    }

    debug!(groups = groups.len(), "parse_rule_spec: done");
    Ok(RuleGroupSpec { groups })
}
