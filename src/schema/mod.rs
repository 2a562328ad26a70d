//! Schema Index
//!
//! Compiled schema descriptions are loaded (from JSON or built in code),
//! then indexed once into an immutable arena shared by every request.
//!
//! # Design Principles
//!
//! - Annotations inherit downward; the index stores resolved values
//! - Build fails on structural errors (missing keys, bad defaults, unknown databases)
//! - State nodes without a mapping are not retrievable

mod index;
mod loader;
mod types;

pub use index::{IndexedNode, NodeId, SchemaIndex};
pub use loader::SchemaLoader;
pub use types::{Classification, LeafType, NodeKind, NodeMapping, SchemaNode};
