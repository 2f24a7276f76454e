//! Rule loading error types

use std::path::PathBuf;
use thiserror::Error;

/// Why a single rule is neither a valid recording nor alerting rule
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleKindError {
    #[error("rule sets both record '{record}' and alert '{alert}'")]
    Ambiguous { record: String, alert: String },

    #[error("rule sets neither record nor alert")]
    MissingKind,

    #[error("recording rule '{record}' cannot carry 'for' or 'annotations'")]
    RecordWithAlertFields { record: String },
}

/// Errors in the content of a rule file
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("malformed rule YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("no groups found")]
    NoGroups,

    #[error("group '{group}', rule #{index}: {source}")]
    InvalidRule {
        group: String,
        index: usize,
        #[source]
        source: RuleKindError,
    },
}

/// Errors that can occur while loading rule files
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to read rule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rule file {path}: {source}")]
    Spec {
        path: PathBuf,
        #[source]
        source: SpecError,
    },

    #[error("Unable to expand directory {dir}: no rule files found")]
    NoRuleFiles { dir: PathBuf },

    #[error("Invalid rule file pattern in {dir}: {source}")]
    Pattern {
        dir: PathBuf,
        #[source]
        source: glob::PatternError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_rule_message_locates_rule() {
        let err = RuleError::Spec {
            path: PathBuf::from("/out/node.yaml"),
            source: SpecError::InvalidRule {
                group: "node".to_string(),
                index: 2,
                source: RuleKindError::MissingKind,
            },
        };

        let msg = err.to_string();
        assert!(msg.contains("/out/node.yaml"));
        assert!(msg.contains("node"));
        assert!(msg.contains("#2"));
    }
}
