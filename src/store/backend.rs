//! Store abstraction
//!
//! The engine talks to the key-value store only through [`KvStore`]:
//! - single-row and table-key reads
//! - batched reads answered from one consistent snapshot
//! - per-database atomic commit of an ordered mutation list

use std::collections::BTreeMap;

use serde::Serialize;

use super::errors::{StoreError, StoreResult};
use super::key::{RowRef, TableRef};
use super::value::FieldMap;

/// One change to one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationOp {
    /// Merge fields into the row, creating it when absent
    Upsert { fields: FieldMap },
    /// Remove named fields; a row left without fields disappears
    DeleteFields { fields: Vec<String> },
    /// Remove the row
    DeleteRow,
}

/// A mutation addressed to a row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMutation {
    pub db: String,
    pub table: String,
    pub key: String,
    #[serde(flatten)]
    pub op: MutationOp,
}

impl TableMutation {
    pub fn upsert(row: &RowRef, fields: FieldMap) -> Self {
        Self::new(row, MutationOp::Upsert { fields })
    }

    pub fn delete_fields(row: &RowRef, fields: Vec<String>) -> Self {
        Self::new(row, MutationOp::DeleteFields { fields })
    }

    pub fn delete_row(row: &RowRef) -> Self {
        Self::new(row, MutationOp::DeleteRow)
    }

    fn new(row: &RowRef, op: MutationOp) -> Self {
        Self {
            db: row.db.clone(),
            table: row.table.clone(),
            key: row.key.clone(),
            op,
        }
    }

    pub fn row(&self) -> RowRef {
        RowRef::new(self.db.clone(), self.table.clone(), self.key.clone())
    }

    pub fn targets(&self, db: &str, table: &str) -> bool {
        self.db == db && self.table == table
    }

    /// Apply this mutation to the rows of its table
    pub fn apply_to(&self, rows: &mut BTreeMap<String, FieldMap>) {
        match &self.op {
            MutationOp::Upsert { fields } => {
                rows.entry(self.key.clone()).or_default().merge(fields);
            }
            MutationOp::DeleteFields { fields } => {
                let emptied = match rows.get_mut(&self.key) {
                    Some(row) => {
                        for f in fields {
                            row.remove(f);
                        }
                        row.is_empty()
                    }
                    None => false,
                };
                if emptied {
                    rows.remove(&self.key);
                }
            }
            MutationOp::DeleteRow => {
                rows.remove(&self.key);
            }
        }
    }

    /// Apply this mutation to a single row in place
    pub fn apply_to_row(&self, row: &mut Option<FieldMap>) {
        let mut rows = BTreeMap::new();
        if let Some(existing) = row.take() {
            rows.insert(self.key.clone(), existing);
        }
        self.apply_to(&mut rows);
        *row = rows.remove(&self.key);
    }
}

/// A batched read: one row, or a whole table when `key` is `None`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReadRequest {
    pub table: TableRef,
    pub key: Option<String>,
}

impl ReadRequest {
    pub fn table(table: TableRef) -> Self {
        Self { table, key: None }
    }

    pub fn row(row: &RowRef) -> Self {
        Self {
            table: row.table_ref(),
            key: Some(row.key.clone()),
        }
    }
}

/// Rows returned by a batched read
///
/// Also usable as a read-only [`KvStore`] so hooks observe the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowSet {
    tables: BTreeMap<TableRef, BTreeMap<String, FieldMap>>,
}

impl RowSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a table was read, even if it returned nothing
    pub fn touch(&mut self, table: TableRef) {
        self.tables.entry(table).or_default();
    }

    pub fn insert(&mut self, table: TableRef, key: impl Into<String>, fields: FieldMap) {
        self.tables.entry(table).or_default().insert(key.into(), fields);
    }

    pub fn rows(&self, db: &str, table: &str) -> Option<&BTreeMap<String, FieldMap>> {
        self.tables.get(&TableRef::new(db, table))
    }

    pub fn row(&self, db: &str, table: &str, key: &str) -> Option<&FieldMap> {
        self.rows(db, table).and_then(|rows| rows.get(key))
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(BTreeMap::len).sum()
    }
}

/// Abstract key-value store
pub trait KvStore: Send + Sync {
    fn get_entry(&self, db: &str, table: &str, key: &str) -> StoreResult<Option<FieldMap>>;

    /// Row keys of a table, sorted
    fn get_keys(&self, db: &str, table: &str) -> StoreResult<Vec<String>>;

    /// Answer every request from one consistent snapshot
    fn read_batch(&self, reads: &[ReadRequest]) -> StoreResult<RowSet>;

    /// Apply mutations for one database atomically, in order
    fn commit(&self, db: &str, mutations: &[TableMutation]) -> StoreResult<()>;
}

impl KvStore for RowSet {
    fn get_entry(&self, db: &str, table: &str, key: &str) -> StoreResult<Option<FieldMap>> {
        Ok(self.row(db, table, key).cloned())
    }

    fn get_keys(&self, db: &str, table: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .rows(db, table)
            .map(|rows| rows.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn read_batch(&self, reads: &[ReadRequest]) -> StoreResult<RowSet> {
        let mut out = RowSet::new();
        for read in reads {
            out.touch(read.table.clone());
            let Some(rows) = self.tables.get(&read.table) else {
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

    fn commit(&self, _db: &str, _mutations: &[TableMutation]) -> StoreResult<()> {
        Err(StoreError::ReadOnly)
    }
}
