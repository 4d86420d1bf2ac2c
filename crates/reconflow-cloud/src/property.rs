//! Flat property records
//!
//! A [`PropertyRecord`] is the user-facing side of a resource: a flat map
//! from field name to a typed [`PropertyValue`]. Absent fields are simply
//! missing from the map; there is no "zero value" stand-in.

use crate::error::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single typed field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    String(String),
    List(Vec<String>),
    Map(BTreeMap<String, String>),
}

impl PropertyValue {
    /// Type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Int(_) => "int",
            PropertyValue::String(_) => "string",
            PropertyValue::List(_) => "list",
            PropertyValue::Map(_) => "map",
        }
    }

    /// An empty list or map. Backends do not tell these apart from unset.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            PropertyValue::List(items) => items.is_empty(),
            PropertyValue::Map(entries) => entries.is_empty(),
            _ => false,
        }
    }
}

impl std::fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::String(s) => write!(f, "{:?}", s),
            PropertyValue::List(items) => write!(f, "{:?}", items),
            PropertyValue::Map(entries) => write!(f, "{:?}", entries),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value.into())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(value: Vec<String>) -> Self {
        PropertyValue::List(value)
    }
}

impl From<BTreeMap<String, String>> for PropertyValue {
    fn from(value: BTreeMap<String, String>) -> Self {
        PropertyValue::Map(value)
    }
}

/// Flat record of field name to value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyRecord {
    fields: BTreeMap<String, PropertyValue>,
}

impl PropertyRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.fields.insert(key.into(), value.into());
    }

    /// Insert only when the value is present
    pub fn insert_opt<V: Into<PropertyValue>>(&mut self, key: impl Into<String>, value: Option<V>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.fields.iter()
    }

    /// Copy without empty lists and maps
    pub fn normalized(&self) -> PropertyRecord {
        self.fields
            .iter()
            .filter(|(_, value)| !value.is_empty_collection())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Overlay every field of `other` onto this record
    pub fn merge(&mut self, other: PropertyRecord) {
        self.fields.extend(other.fields);
    }

    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(PropertyValue::String(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, "string", other)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(PropertyValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(wrong_type(key, "bool", other)),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(PropertyValue::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(wrong_type(key, "int", other)),
        }
    }

    pub fn get_list(&self, key: &str) -> Result<Option<&[String]>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(PropertyValue::List(items)) => Ok(Some(items)),
            Some(other) => Err(wrong_type(key, "list", other)),
        }
    }

    pub fn get_map(&self, key: &str) -> Result<Option<&BTreeMap<String, String>>> {
        match self.fields.get(key) {
            None => Ok(None),
            Some(PropertyValue::Map(entries)) => Ok(Some(entries)),
            Some(other) => Err(wrong_type(key, "map", other)),
        }
    }

    /// Required string field
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)?
            .ok_or_else(|| ReconcileError::invalid_config(format!("`{}` is required", key)))
    }
}

impl FromIterator<(String, PropertyValue)> for PropertyRecord {
    fn from_iter<I: IntoIterator<Item = (String, PropertyValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

fn wrong_type(key: &str, expected: &str, found: &PropertyValue) -> ReconcileError {
    ReconcileError::invalid_config(format!(
        "`{}` must be a {}, found {}",
        key,
        expected,
        found.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_drops_empty_collections() {
        let record = PropertyRecord::new()
            .with("database", "")
            .with("annotations", Vec::<String>::new())
            .with("parameters", BTreeMap::new())
            .with("tags", vec!["a".to_string()]);

        let normalized = record.normalized();
        assert_eq!(normalized.get_str("database").unwrap(), Some(""));
        assert!(!normalized.contains("annotations"));
        assert!(!normalized.contains("parameters"));
        assert!(normalized.contains("tags"));
    }

    #[test]
    fn test_typed_getters() {
        let record = PropertyRecord::new()
            .with("database", "mydb")
            .with("server_version_is_32_or_higher", true)
            .with("batch_frequency_in_seconds", 300);

        assert_eq!(record.get_str("database").unwrap(), Some("mydb"));
        assert_eq!(
            record.get_bool("server_version_is_32_or_higher").unwrap(),
            Some(true)
        );
        assert_eq!(record.get_int("batch_frequency_in_seconds").unwrap(), Some(300));
        assert_eq!(record.get_str("description").unwrap(), None);
    }

    #[test]
    fn test_wrong_type_is_invalid_config() {
        let record = PropertyRecord::new().with("database", true);
        let err = record.get_str("database").unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidConfig(_)));
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn test_insert_opt_skips_none() {
        let mut record = PropertyRecord::new();
        record.insert_opt("description", None::<String>);
        record.insert_opt("database", Some("mydb"));
        assert!(!record.contains("description"));
        assert!(record.contains("database"));
    }

    #[test]
    fn test_deserialize_from_yaml_like_json() {
        let record: PropertyRecord = serde_json::from_value(serde_json::json!({
            "name": "linked1",
            "server_version_is_32_or_higher": false,
            "max_chunk_size_in_bytes": 10485760,
            "annotations": ["a", "b"],
            "parameters": {"foo": "bar"}
        }))
        .unwrap();

        assert_eq!(record.get_str("name").unwrap(), Some("linked1"));
        assert_eq!(record.get_int("max_chunk_size_in_bytes").unwrap(), Some(10485760));
        assert_eq!(
            record.get_list("annotations").unwrap().unwrap(),
            ["a".to_string(), "b".to_string()]
        );
        assert_eq!(
            record.get_map("parameters").unwrap().unwrap().get("foo"),
            Some(&"bar".to_string())
        );
    }
}
