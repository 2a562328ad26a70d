//! Store Executor
//!
//! Applies write plans as one atomic commit per database and answers Get
//! read plans from a single consistent snapshot.
//!
//! # Invariants
//!
//! - Mutations of one database become visible together or not at all
//! - A row written without attributes carries the marker field
//! - Only an explicit row delete removes a row

mod executor;
mod result;

pub use executor::StoreExecutor;
pub use result::CommitReport;
