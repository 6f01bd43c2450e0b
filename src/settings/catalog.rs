//! Flat key/value catalogs of settings.
//!
//! A [`Catalog`] is an ordered map from setting name to an arbitrary JSON
//! value. Only names that follow the setting naming convention (see
//! [`is_setting_name`]) take part in a merge; everything else a source
//! happens to define is carried along but never copied into the settings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Returns `true` if `name` follows the setting naming convention:
/// upper-case ASCII letters, digits and underscores, not starting with a
/// digit, with at least one letter.
pub fn is_setting_name(name: &str) -> bool {
    let Some(first) = name.chars().next() else {
        return false;
    };
    if first.is_ascii_digit() {
        return false;
    }

    name.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
        && name.chars().any(|c| c.is_ascii_uppercase())
}

/// Ordered key/value catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: IndexMap<String, Value>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, including ones that are not settings.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries whose names follow the setting naming convention.
    pub fn settings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter().filter(|(k, _)| is_setting_name(k))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<IndexMap<String, Value>> for Catalog {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl From<Catalog> for IndexMap<String, Value> {
    fn from(catalog: Catalog) -> Self {
        catalog.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn setting_names_are_upper_case() {
        assert!(is_setting_name("QUEUE_CONFIG"));
        assert!(is_setting_name("SQS_TASK_SIZE_LIMIT"));
        assert!(is_setting_name("A"));
        assert!(is_setting_name("_PRIVATE_BUT_UPPER"));
        assert!(is_setting_name("RETRY_2"));
    }

    #[test]
    fn non_conforming_names_are_rejected() {
        assert!(!is_setting_name(""));
        assert!(!is_setting_name("queue_config"));
        assert!(!is_setting_name("Queue_Config"));
        assert!(!is_setting_name("__doc__"));
        assert!(!is_setting_name("___"));
        assert!(!is_setting_name("2FAST"));
        assert!(!is_setting_name("QUEUE-CONFIG"));
        assert!(!is_setting_name("ÜBER"));
    }

    #[test]
    fn settings_iterator_filters_by_name() {
        let catalog = Catalog::new()
            .with("A", 1)
            .with("lower", 2)
            .with("B", "two");

        let keys: Vec<_> = catalog.settings().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn preserves_insertion_order() {
        let catalog: Catalog = [("Z", json!(1)), ("A", json!(2)), ("M", json!(3))]
            .into_iter()
            .collect();
        let keys: Vec<_> = catalog.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }

    #[test]
    fn insert_returns_replaced_value() {
        let mut catalog = Catalog::new().with("A", 1);
        assert_eq!(catalog.insert("A", 2), Some(json!(1)));
        assert_eq!(catalog.get("A"), Some(&json!(2)));
    }

    #[test]
    fn deserializes_from_flat_json_object() {
        let catalog: Catalog = serde_json::from_str(r#"{"A": 1, "B": [1, 2]}"#).unwrap();
        assert_eq!(catalog.get("B"), Some(&json!([1, 2])));
    }
}
