//! Runtime support manifest consulted by the pruning pass
//!
//! The manifest is a JSON object mapping a property name to the list of
//! values for which the prefixed form must be kept:
//!
//! ```json
//! { "display": ["-ms-flexbox"], "hyphens": [], "calc": [] }
//! ```
//!
//! An empty list asserts support for the property with any value. A missing
//! property asserts nothing.

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportManifest {
    entries: HashMap<String, Vec<String>>,
}

impl SupportManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| CompilerError::manifest(format!("Invalid manifest JSON: {}", e)))
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| CompilerError::FileNotFound {
            path: format!("Manifest {}: {}", path, e),
        })?;
        let manifest = Self::from_json_str(&content)?;
        log::info!("Loaded support manifest from {} ({} properties)", path, manifest.len());
        Ok(manifest)
    }

    /// Asserts support for `property` with any value.
    pub fn allow_any(mut self, property: impl Into<String>) -> Self {
        self.entries.insert(property.into(), Vec::new());
        self
    }

    /// Asserts support for `property` with each of `values`.
    pub fn allow_values<I, S>(mut self, property: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.entries.entry(property.into()).or_default();
        entry.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn contains_property(&self, property: &str) -> bool {
        self.entries.contains_key(property)
    }

    pub fn values(&self, property: &str) -> Option<&[String]> {
        self.entries.get(property).map(Vec::as_slice)
    }

    /// Absent entry: not supported. Empty list: supported for any value.
    /// Otherwise the value must be listed; a missing value never matches a
    /// non-empty list.
    pub fn supports(&self, property: &str, value: Option<&str>) -> bool {
        match self.entries.get(property) {
            None => false,
            Some(values) if values.is_empty() => true,
            Some(values) => value.map_or(false, |v| values.iter().any(|listed| listed == v)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_support_semantics() {
        let manifest = SupportManifest::new()
            .allow_any("hyphens")
            .allow_values("display", ["-ms-flexbox"]);

        assert!(!manifest.supports("transform", Some("none")));
        assert!(!manifest.supports("transform", None));

        assert!(manifest.supports("hyphens", Some("auto")));
        assert!(manifest.supports("hyphens", None));

        assert!(manifest.supports("display", Some("-ms-flexbox")));
        assert!(!manifest.supports("display", Some("flex")));
        assert!(!manifest.supports("display", None));
    }

    #[test]
    fn test_from_json() {
        let manifest = SupportManifest::from_json_str(r#"{"display": ["-ms-flexbox"], "calc": []}"#).unwrap();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains_property("calc"));
        assert_eq!(manifest.values("display"), Some(&["-ms-flexbox".to_string()][..]));
    }

    #[test]
    fn test_invalid_json() {
        let err = SupportManifest::from_json_str(r#"{"display": "flex"}"#).unwrap_err();
        assert!(matches!(err, CompilerError::Manifest { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"user-select": []}}"#).unwrap();

        let manifest = SupportManifest::load(file.path().to_str().unwrap()).unwrap();
        assert!(manifest.supports("user-select", Some("none")));

        assert!(SupportManifest::load("/nonexistent/manifest.json").is_err());
    }
}
