//! A single variable layer

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use super::VarsError;
use crate::paths::base_name;

/// File name suffix of a variable layer
pub const VARS_SUFFIX: &str = ".vars";

/// One named layer of text variables
///
/// Values are decoded as text at the YAML boundary: a scalar such as `7.3`
/// or `true` is kept as the string `"7.3"` / `"true"`, exactly as written.
/// A null value (`~`, `null` or nothing after the colon) is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableSet {
    layer: String,
    values: BTreeMap<String, String>,
}

impl VariableSet {
    /// An empty layer with the given name
    pub fn empty(layer: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            values: BTreeMap::new(),
        }
    }

    /// Build a layer from key/value pairs
    pub fn from_pairs<K, V>(layer: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            layer: layer.into(),
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Load a layer from a `.vars` file
    ///
    /// The layer is named after the file with the `.vars` suffix stripped. A
    /// missing file yields an empty layer rather than an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VarsError> {
        let path = path.as_ref();
        let layer = layer_name(path);
        debug!(?path, %layer, "VariableSet::load: called");

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("VariableSet::load: file missing, using empty layer");
                return Ok(Self::empty(layer));
            }
            Err(source) => {
                return Err(VarsError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        Self::parse(layer, &content).map_err(|source| VarsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse YAML text into a named layer
    pub fn parse(layer: impl Into<String>, content: &str) -> Result<Self, serde_yaml::Error> {
        let layer = layer.into();
        if content.trim().is_empty() {
            return Ok(Self::empty(layer));
        }

        // Deserializing into String keeps the scalar's source text
        let values: Option<BTreeMap<String, Option<String>>> = serde_yaml::from_str(content)?;
        let values = values
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.unwrap_or_default()))
            .collect();
        Ok(Self { layer, values })
    }

    /// Layer name
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Set a variable, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// All variables, ordered by key
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Merge two layers, letting anything set in `overlay` win over `base`
///
/// Neither input is modified. The result carries the overlay's layer name.
pub fn compose(base: &VariableSet, overlay: &VariableSet) -> VariableSet {
    debug!(base = %base.layer, overlay = %overlay.layer, "compose: called");
    let mut values = base.values.clone();
    for (key, value) in &overlay.values {
        values.insert(key.clone(), value.clone());
    }
    VariableSet {
        layer: overlay.layer.clone(),
        values,
    }
}

fn layer_name(path: &Path) -> String {
    let name = base_name(path);
    match name.strip_suffix(VARS_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => name,
    }
}
