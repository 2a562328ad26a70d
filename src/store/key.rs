//! Row addressing
//!
//! A row is addressed by database, table and a key string. Multi-component
//! keys are joined with the database key separator (`Ethernet0|1.1.1.1/24`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered components of a row key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct DbKey {
    comps: Vec<String>,
}

impl DbKey {
    pub fn new(comps: Vec<String>) -> Self {
        Self { comps }
    }

    /// Split a key string on the separator
    pub fn parse(text: &str, separator: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self {
            comps: text.split(separator).map(str::to_string).collect(),
        }
    }

    pub fn comps(&self) -> &[String] {
        &self.comps
    }

    pub fn len(&self) -> usize {
        self.comps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.comps.get(index).map(String::as_str)
    }

    pub fn last(&self) -> Option<&str> {
        self.comps.last().map(String::as_str)
    }

    pub fn push(&mut self, comp: impl Into<String>) {
        self.comps.push(comp.into());
    }

    pub fn join(&self, separator: &str) -> String {
        self.comps.join(separator)
    }

    /// Component-wise prefix match
    pub fn starts_with(&self, prefix: &DbKey) -> bool {
        self.comps.len() >= prefix.comps.len()
            && self.comps.iter().zip(prefix.comps.iter()).all(|(a, b)| a == b)
    }

    /// Key without its last component
    pub fn parent(&self) -> DbKey {
        let n = self.comps.len().saturating_sub(1);
        DbKey::new(self.comps[..n].to_vec())
    }
}

impl fmt::Display for DbKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.comps.join("|"))
    }
}

/// A table within a database
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub db: String,
    pub table: String,
}

impl TableRef {
    pub fn new(db: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.db, self.table)
    }
}

/// A single row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowRef {
    pub db: String,
    pub table: String,
    pub key: String,
}

impl RowRef {
    pub fn new(db: impl Into<String>, table: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(self.db.clone(), self.table.clone())
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}|{}", self.db, self.table, self.key)
    }
}
