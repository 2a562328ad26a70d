//! In-memory store
//!
//! All databases sit behind one `RwLock`, so a batched read sees one
//! consistent snapshot and a commit is atomic with respect to readers.
//! Dumps use the composed row keys of the real store
//! (`{"CONFIG_DB": {"PORT|Ethernet0": {"mtu": "9100"}}}`).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use serde_json::{Map, Value};

use super::backend::{KvStore, ReadRequest, RowSet, TableMutation};
use super::errors::{StoreError, StoreResult};
use super::value::FieldMap;
use crate::config::EngineConfig;

type Tables = BTreeMap<String, BTreeMap<String, FieldMap>>;

/// RwLock-guarded map of database -> table -> key -> row
#[derive(Debug)]
pub struct InMemoryStore {
    dbs: RwLock<BTreeMap<String, Tables>>,
    table_separators: BTreeMap<String, String>,
}

impl InMemoryStore {
    /// Empty store with one database per configured name
    pub fn new(config: &EngineConfig) -> Self {
        let mut dbs = BTreeMap::new();
        let mut table_separators = BTreeMap::new();
        for (name, options) in &config.databases {
            dbs.insert(name.clone(), Tables::new());
            table_separators.insert(name.clone(), options.table_separator.clone());
        }
        Self {
            dbs: RwLock::new(dbs),
            table_separators,
        }
    }

    /// Insert or merge a row directly, bypassing the engine
    pub fn insert_row(&self, db: &str, table: &str, key: &str, fields: FieldMap) -> StoreResult<()> {
        let mut dbs = self.dbs.write().map_err(|_| StoreError::Poisoned)?;
        let tables = dbs
            .get_mut(db)
            .ok_or_else(|| StoreError::UnknownDatabase(db.to_string()))?;
        tables
            .entry(table.to_string())
            .or_default()
            .entry(key.to_string())
            .or_default()
            .merge(&fields);
        Ok(())
    }

    /// Number of rows held in one database
    pub fn row_count(&self, db: &str) -> StoreResult<usize> {
        let dbs = self.dbs.read().map_err(|_| StoreError::Poisoned)?;
        let tables = dbs
            .get(db)
            .ok_or_else(|| StoreError::UnknownDatabase(db.to_string()))?;
        Ok(tables.values().map(BTreeMap::len).sum())
    }

    /// Merge a JSON dump into the store
    pub fn load_json(&self, dump: &Value) -> StoreResult<()> {
        let root = dump
            .as_object()
            .ok_or_else(|| StoreError::MalformedDump("top level must be an object".into()))?;

        for (db, rows) in root {
            let sep = self
                .table_separators
                .get(db)
                .ok_or_else(|| StoreError::UnknownDatabase(db.clone()))?;
            let rows = rows
                .as_object()
                .ok_or_else(|| StoreError::MalformedDump(format!("{} must be an object", db)))?;

            for (full_key, fields) in rows {
                let (table, key) = full_key.split_once(sep.as_str()).ok_or_else(|| {
                    StoreError::MalformedDump(format!("row key '{}' has no table separator", full_key))
                })?;
                let fields: FieldMap = serde_json::from_value(fields.clone())?;
                self.insert_row(db, table, key, fields)?;
            }
        }
        Ok(())
    }

    /// Full contents as a JSON dump
    pub fn dump_json(&self) -> StoreResult<Value> {
        let dbs = self.dbs.read().map_err(|_| StoreError::Poisoned)?;
        let mut root = Map::new();
        for (db, tables) in dbs.iter() {
            let sep = self.table_separators.get(db).map(String::as_str).unwrap_or("|");
            let mut rows = Map::new();
            for (table, keyed) in tables {
                for (key, fields) in keyed {
                    rows.insert(format!("{}{}{}", table, sep, key), serde_json::to_value(fields)?);
                }
            }
            if !rows.is_empty() {
                root.insert(db.clone(), Value::Object(rows));
            }
        }
        Ok(Value::Object(root))
    }

    pub fn load_file(&self, path: &Path) -> StoreResult<()> {
        let content = fs::read_to_string(path)?;
        let dump: Value = serde_json::from_str(&content)?;
        self.load_json(&dump)
    }

    pub fn save_file(&self, path: &Path) -> StoreResult<()> {
        let dump = self.dump_json()?;
        fs::write(path, serde_json::to_string_pretty(&dump)?)?;
        Ok(())
    }
}

impl KvStore for InMemoryStore {
    fn get_entry(&self, db: &str, table: &str, key: &str) -> StoreResult<Option<FieldMap>> {
        let dbs = self.dbs.read().map_err(|_| StoreError::Poisoned)?;
        let tables = dbs
            .get(db)
            .ok_or_else(|| StoreError::UnknownDatabase(db.to_string()))?;
        Ok(tables.get(table).and_then(|rows| rows.get(key)).cloned())
    }

    fn get_keys(&self, db: &str, table: &str) -> StoreResult<Vec<String>> {
        let dbs = self.dbs.read().map_err(|_| StoreError::Poisoned)?;
        let tables = dbs
            .get(db)
            .ok_or_else(|| StoreError::UnknownDatabase(db.to_string()))?;
        Ok(tables
            .get(table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read_batch(&self, reads: &[ReadRequest]) -> StoreResult<RowSet> {
        // one read guard for the whole batch
        let dbs = self.dbs.read().map_err(|_| StoreError::Poisoned)?;
        let mut out = RowSet::new();

        for read in reads {
            let tables = dbs
                .get(&read.table.db)
                .ok_or_else(|| StoreError::UnknownDatabase(read.table.db.clone()))?;
            out.touch(read.table.clone());
            let Some(rows) = tables.get(&read.table.table) else {
                continue;
            };
            match &read.key {
                Some(key) => {
                    if let Some(row) = rows.get(key) {
                        out.insert(read.table.clone(), key.clone(), row.clone());
                    }
                }
                None => {
                    for (key, row) in rows {
                        out.insert(read.table.clone(), key.clone(), row.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn commit(&self, db: &str, mutations: &[TableMutation]) -> StoreResult<()> {
        if let Some(m) = mutations.iter().find(|m| m.db != db) {
            return Err(StoreError::DatabaseMismatch {
                expected: db.to_string(),
                found: m.db.clone(),
            });
        }

        let mut dbs = self.dbs.write().map_err(|_| StoreError::Poisoned)?;
        let tables = dbs
            .get_mut(db)
            .ok_or_else(|| StoreError::UnknownDatabase(db.to_string()))?;

        // Apply to a copy so a failure leaves the database untouched
        let mut staged = tables.clone();
        for m in mutations {
            let rows = staged.entry(m.table.clone()).or_default();
            m.apply_to(rows);
            if rows.is_empty() {
                staged.remove(&m.table);
            }
        }
        *tables = staged;
        Ok(())
    }
}
