//! Engine configuration
//!
//! Every field has a default so an empty JSON object is a valid config.
//! Databases carry their own separators: CONFIG_DB style stores use `|`
//! while APPL_DB style stores use `:`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{XlateError, XlateResult};
use crate::observability::Severity;

pub const CONFIG_DB: &str = "CONFIG_DB";
pub const STATE_DB: &str = "STATE_DB";
pub const APPL_DB: &str = "APPL_DB";
pub const COUNTERS_DB: &str = "COUNTERS_DB";

/// Separators for one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbOptions {
    /// Between table name and row key
    #[serde(default = "default_separator")]
    pub table_separator: String,

    /// Between row key components
    #[serde(default = "default_separator")]
    pub key_separator: String,
}

fn default_separator() -> String {
    "|".to_string()
}

impl DbOptions {
    pub fn new(table_separator: impl Into<String>, key_separator: impl Into<String>) -> Self {
        Self {
            table_separator: table_separator.into(),
            key_separator: key_separator.into(),
        }
    }
}

impl Default for DbOptions {
    fn default() -> Self {
        Self::new("|", "|")
    }
}

/// Translation engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Known databases and their separators
    #[serde(default = "default_databases")]
    pub databases: BTreeMap<String, DbOptions>,

    /// Database used when no mapping names one
    #[serde(default = "default_db")]
    pub default_db: String,

    /// Field written to rows that exist without attributes
    #[serde(default = "default_marker")]
    pub marker_field: String,

    #[serde(default = "default_marker")]
    pub marker_value: String,

    /// Suffix marking a multi-valued field
    #[serde(default = "default_leaf_list_suffix")]
    pub leaf_list_suffix: String,

    /// Separator between multi-valued field members
    #[serde(default = "default_leaf_list_separator")]
    pub leaf_list_separator: String,

    /// Minimum log severity (trace, info, warn, error, fatal)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_databases() -> BTreeMap<String, DbOptions> {
    let mut dbs = BTreeMap::new();
    dbs.insert(CONFIG_DB.to_string(), DbOptions::new("|", "|"));
    dbs.insert(STATE_DB.to_string(), DbOptions::new("|", "|"));
    dbs.insert(APPL_DB.to_string(), DbOptions::new(":", ":"));
    dbs.insert(COUNTERS_DB.to_string(), DbOptions::new(":", ":"));
    dbs
}

fn default_db() -> String {
    CONFIG_DB.to_string()
}

fn default_marker() -> String {
    "NULL".to_string()
}

fn default_leaf_list_suffix() -> String {
    "@".to_string()
}

fn default_leaf_list_separator() -> String {
    ",".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            databases: default_databases(),
            default_db: default_db(),
            marker_field: default_marker(),
            marker_value: default_marker(),
            leaf_list_suffix: default_leaf_list_suffix(),
            leaf_list_separator: default_leaf_list_separator(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> XlateResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            XlateError::internal(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            XlateError::internal(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Register or override a database
    pub fn with_database(mut self, name: impl Into<String>, options: DbOptions) -> Self {
        self.databases.insert(name.into(), options);
        self
    }

    /// Separators for a database; unknown names are internal errors
    pub fn db(&self, name: &str) -> XlateResult<&DbOptions> {
        self.databases
            .get(name)
            .ok_or_else(|| XlateError::internal(format!("Unknown database '{}'", name)))
    }

    pub fn key_separator(&self, db: &str) -> XlateResult<&str> {
        Ok(self.db(db)?.key_separator.as_str())
    }

    /// True when a field map entry is the existence marker
    pub fn is_marker(&self, field: &str) -> bool {
        field == self.marker_field
    }

    /// Parsed minimum log severity; unknown names fall back to WARN
    pub fn severity(&self) -> Severity {
        match self.log_level.to_ascii_lowercase().as_str() {
            "trace" => Severity::Trace,
            "info" => Severity::Info,
            "error" => Severity::Error,
            "fatal" => Severity::Fatal,
            _ => Severity::Warn,
        }
    }
}
