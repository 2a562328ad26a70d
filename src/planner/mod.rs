//! Operation Planner
//!
//! Turns a resolved request into store work: row mutations for Create,
//! Update, Replace and Delete, or the table set a Get must read.

mod delete;
mod plan;
mod read;
mod to_db;

pub use plan::{OperationPlan, ReadPlan};
pub use read::plan_reads;
pub use to_db::Planner;
