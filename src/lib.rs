//! treexlate - schema-driven translation between hierarchical management
//! trees and flat key-value tables
//!
//! A request names a path in a YANG-style tree. The engine resolves it
//! against the schema index, plans row mutations through the transformer
//! hooks, validates them against the pending store state and commits one
//! batch per database. Gets run the same mapping in reverse and assemble
//! JSON, filtered by the depth, content and fields query parameters.

pub mod assembler;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod executor;
pub mod models;
pub mod observability;
pub mod path;
pub mod planner;
pub mod query;
pub mod schema;
pub mod store;
pub mod transformer;
pub mod validation;

pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder};
pub use errors::{XlateError, XlateErrorCode, XlateResult};
pub use query::{ContentKind, QueryParameters};
pub use transformer::Operation;
