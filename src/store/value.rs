//! Row contents
//!
//! A row is a flat map of field name to string value. Multi-valued fields
//! are one entry whose name ends with the configured suffix (`members@`)
//! and whose value joins the members with the configured separator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field name to value map of one row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, String>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field map
    pub fn with(field: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = Self::new();
        map.set(field, value);
        map
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Merge every field of `other` into this map
    pub fn merge(&mut self, other: &FieldMap) {
        for (k, v) in other.iter() {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Members of a multi-valued field; absent or empty gives no members
    pub fn get_list(&self, field: &str, separator: &str) -> Vec<String> {
        match self.get(field) {
            Some(v) if !v.is_empty() => v.split(separator).map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    pub fn set_list(&mut self, field: impl Into<String>, members: &[String], separator: &str) {
        self.set(field, members.join(separator));
    }

    /// True when the row holds anything besides the marker field
    pub fn has_real_fields(&self, marker_field: &str) -> bool {
        self.0.keys().any(|k| k != marker_field)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl FromIterator<(String, String)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<BTreeMap<String, String>> for FieldMap {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
