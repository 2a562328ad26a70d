//! Pending view: committed store state with a mutation list applied on top

use std::collections::BTreeMap;

use super::backend::{KvStore, ReadRequest, RowSet, TableMutation};
use super::errors::{StoreError, StoreResult};
use super::key::TableRef;
use super::value::FieldMap;

/// Read-only view of what the store will hold once `mutations` commit
pub struct PendingView<'a> {
    base: &'a dyn KvStore,
    mutations: &'a [TableMutation],
}

impl<'a> PendingView<'a> {
    pub fn new(base: &'a dyn KvStore, mutations: &'a [TableMutation]) -> Self {
        Self { base, mutations }
    }

    /// Store state before the mutations
    pub fn committed(&self) -> &'a dyn KvStore {
        self.base
    }

    pub fn mutations(&self) -> &'a [TableMutation] {
        self.mutations
    }

    /// Mutations addressed to one table
    pub fn mutations_for(&self, db: &str, table: &str) -> impl Iterator<Item = &'a TableMutation> + 'a {
        let mutations: &'a [TableMutation] = self.mutations;
        let db = db.to_string();
        let table = table.to_string();
        mutations.iter().filter(move |m| m.targets(&db, &table))
    }

    /// Every row of a table as it will be after commit
    pub fn table(&self, db: &str, table: &str) -> StoreResult<BTreeMap<String, FieldMap>> {
        let snapshot = self.base.read_batch(&[ReadRequest::table(TableRef::new(db, table))])?;
        let mut rows = snapshot.rows(db, table).cloned().unwrap_or_default();
        for m in self.mutations_for(db, table) {
            m.apply_to(&mut rows);
        }
        Ok(rows)
    }
}

impl KvStore for PendingView<'_> {
    fn get_entry(&self, db: &str, table: &str, key: &str) -> StoreResult<Option<FieldMap>> {
        let mut row = self.base.get_entry(db, table, key)?;
        for m in self.mutations_for(db, table).filter(|m| m.key == key) {
            m.apply_to_row(&mut row);
        }
        Ok(row)
    }

    fn get_keys(&self, db: &str, table: &str) -> StoreResult<Vec<String>> {
        Ok(self.table(db, table)?.into_keys().collect())
    }

    fn read_batch(&self, reads: &[ReadRequest]) -> StoreResult<RowSet> {
        let mut out = RowSet::new();
        for read in reads {
            out.touch(read.table.clone());
            let rows = self.table(&read.table.db, &read.table.table)?;
            for (key, row) in rows {
                if read.key.as_deref().map_or(true, |k| k == key) {
                    out.insert(read.table.clone(), key, row);
                }
            }
        }
        Ok(out)
    }

    fn commit(&self, _db: &str, _mutations: &[TableMutation]) -> StoreResult<()> {
        Err(StoreError::ReadOnly)
    }
}
