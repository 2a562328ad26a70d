//! Request counters
//!
//! - Counters only, monotonic
//! - Reset only when the registry is created
//! - Relaxed atomics; values are exact once requests have returned

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::transformer::Operation;

/// Counters kept per engine
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    gets: AtomicU64,
    creates: AtomicU64,
    updates: AtomicU64,
    replaces: AtomicU64,
    deletes: AtomicU64,
    /// Requests that returned an error
    rejected: AtomicU64,
    /// Plans refused by a validator
    validation_failures: AtomicU64,
    /// Rows returned by snapshot reads
    rows_read: AtomicU64,
    /// Mutations handed to the store
    mutations_committed: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request of the given operation
    pub fn record_request(&self, oper: Operation) {
        let counter = match oper {
            Operation::Get => &self.gets,
            Operation::Create => &self.creates,
            Operation::Update => &self.updates,
            Operation::Replace => &self.replaces,
            Operation::Delete => &self.deletes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_validation_failures(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_rows_read(&self, rows: u64) {
        self.rows_read.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn add_mutations(&self, mutations: u64) {
        self.mutations_committed.fetch_add(mutations, Ordering::Relaxed);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn mutations_committed(&self) -> u64 {
        self.mutations_committed.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            replaces: self.replaces.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            rows_read: self.rows_read.load(Ordering::Relaxed),
            mutations_committed: self.mutations_committed.load(Ordering::Relaxed),
        }
    }
}

/// Serializable counter values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub gets: u64,
    pub creates: u64,
    pub updates: u64,
    pub replaces: u64,
    pub deletes: u64,
    pub rejected: u64,
    pub validation_failures: u64,
    pub rows_read: u64,
    pub mutations_committed: u64,
}
