//! Resource names for rule files

use std::path::Path;

use crate::paths::base_name;

/// Suffix removed from a rule file's base name
pub const RULE_FILE_SUFFIX: &str = ".yaml";

/// Derive the `PrometheusRule` name for a rule file
///
/// `<target>-<stem>-rules`, where the stem is the base name without its
/// `.yaml` suffix and with every `.` replaced by `-`. Only that exact suffix
/// is removed; other extensions stay part of the stem.
pub fn derive_name(file: impl AsRef<Path>, target: &str) -> String {
    let base = base_name(file.as_ref());
    let stem = base.strip_suffix(RULE_FILE_SUFFIX).unwrap_or(&base);
    format!("{}-{}-rules", target, stem.replace('.', "-"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_name() {
        assert_eq!(derive_name("/tmp/x/node.yaml", "k8s"), "k8s-node-rules");
        assert_eq!(derive_name("kube.state.yaml", "main"), "main-kube-state-rules");
        assert_eq!(derive_name("a.b.c.yaml", "p"), "p-a-b-c-rules");
    }

    #[test]
    fn test_derive_name_only_strips_yaml() {
        assert_eq!(derive_name("rules.yml", "p"), "p-rules-yml-rules");
        assert_eq!(derive_name("rules", "p"), "p-rules-rules");
    }

    proptest! {
        #[test]
        fn derived_name_has_no_dots(stem in "[a-z0-9.]{1,20}", target in "[a-z0-9]{1,10}") {
            let name = derive_name(format!("/out/{stem}.yaml"), &target);
            prop_assert!(!name.contains('.'));
            let prefix = format!("{}-", target);
            prop_assert!(name.starts_with(&prefix));
            prop_assert!(name.ends_with("-rules"));
        }
    }
}
