//! Plans produced by the planner
//!
//! A write plan is an ordered list of row mutations; a read plan is the set
//! of tables a Get must snapshot. Both are plain data: planning never
//! touches the store for writing.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use crate::store::{ReadRequest, RowRef, TableMutation, TableRef};
use crate::transformer::Operation;

/// Ordered mutations for one Set-family request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationPlan {
    pub oper: Operation,
    pub path: String,
    pub mutations: Vec<TableMutation>,
}

impl OperationPlan {
    pub fn new(oper: Operation, path: impl Into<String>) -> Self {
        Self {
            oper,
            path: path.into(),
            mutations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Databases touched, in order of first mutation
    pub fn databases(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.mutations
            .iter()
            .filter(|m| seen.insert(m.db.clone()))
            .map(|m| m.db.clone())
            .collect()
    }

    /// Mutations of one database, order preserved
    pub fn for_db(&self, db: &str) -> Vec<TableMutation> {
        self.mutations.iter().filter(|m| m.db == db).cloned().collect()
    }

    /// Rows touched by the plan
    pub fn rows(&self) -> BTreeSet<RowRef> {
        self.mutations.iter().map(TableMutation::row).collect()
    }
}

/// Tables a Get reads, deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadPlan {
    tables: BTreeSet<TableRef>,
}

impl ReadPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, table: TableRef) {
        self.tables.insert(table);
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableRef> {
        self.tables.iter()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Whole-table batched reads
    pub fn requests(&self) -> Vec<ReadRequest> {
        self.tables.iter().cloned().map(ReadRequest::table).collect()
    }
}
