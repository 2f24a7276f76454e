//! All variable layers of a source directory

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use super::{VARS_SUFFIX, VariableSet, VarsError, compose};
use crate::paths::matching_files;

/// Name of the base layer every context inherits from
pub const DEFAULT_LAYER: &str = "default";

/// Key that always holds the identifier of the context being expanded
pub const CONTEXT_KEY: &str = "context";

/// Variable layers keyed by layer name, immutable once loaded
#[derive(Debug, Clone, Default)]
pub struct VariableStore {
    layers: HashMap<String, VariableSet>,
}

impl VariableStore {
    /// Load every `*.vars` file at the top level of `dir`
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, VarsError> {
        let dir = dir.as_ref();
        debug!(?dir, "VariableStore::load_dir: called");

        let files = matching_files(dir, &format!("*{}", VARS_SUFFIX)).map_err(|source| VarsError::Pattern {
            dir: dir.to_path_buf(),
            source,
        })?;

        let mut layers = HashMap::new();
        for file in files {
            let set = VariableSet::load(&file)?;
            debug!(layer = %set.layer(), count = set.len(), "VariableStore::load_dir: loaded layer");
            layers.insert(set.layer().to_string(), set);
        }

        info!("Loaded {} variable layer(s) from {}", layers.len(), dir.display());
        Ok(Self { layers })
    }

    /// Build a store from already-loaded layers
    pub fn from_layers(layers: impl IntoIterator<Item = VariableSet>) -> Self {
        Self {
            layers: layers.into_iter().map(|set| (set.layer().to_string(), set)).collect(),
        }
    }

    /// A named layer, or an empty one if no such layer was loaded
    pub fn layer(&self, name: &str) -> VariableSet {
        self.layers.get(name).cloned().unwrap_or_else(|| VariableSet::empty(name))
    }

    /// Whether a layer with this name was loaded
    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Number of loaded layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Variables for one context: default layer, then the context's own layer,
    /// then `context` forced to the identifier
    ///
    /// The `context` key is always overwritten so no vars file can spoof it.
    pub fn for_context(&self, context: &str) -> VariableSet {
        debug!(%context, "VariableStore::for_context: called");
        let mut vars = compose(&self.layer(DEFAULT_LAYER), &self.layer(context));
        vars.insert(CONTEXT_KEY, context);
        vars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_dir() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("default.vars"), "severity: warning\nteam: infra").unwrap();
        fs::write(temp.path().join("context1.vars"), "severity: critical").unwrap();
        fs::write(temp.path().join("rules.yaml"), "groups: []").unwrap();

        let store = VariableStore::load_dir(temp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.has_layer("default"));
        assert!(store.has_layer("context1"));
    }

    #[test]
    fn test_load_dir_propagates_parse_errors() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("default.vars"), "{ not: [valid").unwrap();

        let result = VariableStore::load_dir(temp.path());
        assert!(matches!(result, Err(VarsError::Parse { .. })));
    }

    #[test]
    fn test_missing_layer_is_empty() {
        let store = VariableStore::default();
        let set = store.layer("prod");
        assert!(set.is_empty());
        assert_eq!(set.layer(), "prod");
    }

    #[test]
    fn test_for_context_layers_in_order() {
        let store = VariableStore::from_layers([
            VariableSet::from_pairs("default", [("severity", "warning"), ("team", "infra")]),
            VariableSet::from_pairs("prod", [("severity", "critical")]),
        ]);

        let prod = store.for_context("prod");
        assert_eq!(prod.get("severity"), Some("critical"));
        assert_eq!(prod.get("team"), Some("infra"));
        assert_eq!(prod.get("context"), Some("prod"));

        let staging = store.for_context("staging");
        assert_eq!(staging.get("severity"), Some("warning"));
        assert_eq!(staging.get("context"), Some("staging"));
    }

    #[test]
    fn test_context_key_cannot_be_spoofed() {
        let store = VariableStore::from_layers([
            VariableSet::from_pairs("default", [("context", "from-default")]),
            VariableSet::from_pairs("prod", [("context", "from-prod")]),
        ]);

        assert_eq!(store.for_context("prod").get("context"), Some("prod"));
        assert_eq!(store.for_context("other").get("context"), Some("other"));
    }
}
