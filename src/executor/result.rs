//! Commit results

use serde::Serialize;

/// What a commit applied
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// Databases committed, in commit order
    pub databases: Vec<String>,
    /// Mutations applied across all databases
    pub mutations: usize,
}

impl CommitReport {
    pub fn record(&mut self, db: String, mutations: usize) {
        self.databases.push(db);
        self.mutations += mutations;
    }

    pub fn is_empty(&self) -> bool {
        self.mutations == 0
    }
}
