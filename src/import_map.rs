//! Browser import map.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::BuildConfig;
use crate::specifier::{runtime_url, PackageSpecifier};

/// Runtime specifiers always present so CDN packages built with
/// `?external=react,react-dom` can resolve them.
const RUNTIME_SPECIFIERS: [&str; 6] = [
    "react",
    "react/",
    "react-dom",
    "react-dom/",
    "react-dom/client",
    "react/jsx-runtime",
];

/// Specifier → URL. Serializes as `{"imports": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportMap {
    pub imports: BTreeMap<String, String>,
}

impl ImportMap {
    /// An import map pre-populated with the pinned framework runtime.
    pub fn with_runtime(config: &BuildConfig) -> Self {
        let mut map = Self::default();
        for specifier in RUNTIME_SPECIFIERS {
            let url = match specifier.strip_suffix('/') {
                Some(name) => format!(
                    "{}/{}@{}/",
                    config.cdn_base_url, name, config.runtime_version
                ),
                None => match PackageSpecifier::parse(specifier) {
                    Some(package) => runtime_url(&package, config),
                    None => continue,
                },
            };
            map.insert_if_absent(specifier, &url);
        }
        map
    }

    /// Adds an entry unless the specifier is already mapped. Returns `true`
    /// when the entry was added.
    pub fn insert_if_absent(&mut self, specifier: &str, url: &str) -> bool {
        if self.imports.contains_key(specifier) {
            return false;
        }
        self.imports.insert(specifier.to_string(), url.to_string());
        true
    }

    pub fn get(&self, specifier: &str) -> Option<&str> {
        self.imports.get(specifier).map(String::as_str)
    }

    pub fn contains(&self, specifier: &str) -> bool {
        self.imports.contains_key(specifier)
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{\"imports\":{}}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_entries() {
        let map = ImportMap::with_runtime(&BuildConfig::default());
        assert_eq!(map.get("react"), Some("https://esm.sh/react@19"));
        assert_eq!(map.get("react/"), Some("https://esm.sh/react@19/"));
        assert_eq!(map.get("react-dom/client"), Some("https://esm.sh/react-dom@19/client"));
        assert_eq!(map.get("react/jsx-runtime"), Some("https://esm.sh/react@19/jsx-runtime"));
    }

    #[test]
    fn test_first_classification_wins() {
        let mut map = ImportMap::default();
        assert!(map.insert_if_absent("lodash", "https://a"));
        assert!(!map.insert_if_absent("lodash", "https://b"));
        assert_eq!(map.get("lodash"), Some("https://a"));
    }

    #[test]
    fn test_json_shape() {
        let mut map = ImportMap::default();
        map.insert_if_absent("x", "data:1");
        let value: serde_json::Value = serde_json::from_str(&map.to_json()).unwrap();
        assert_eq!(value, serde_json::json!({ "imports": { "x": "data:1" } }));
    }
}
