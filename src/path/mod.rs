//! Path Resolver
//!
//! Parses `/module:a/b[k=v]/c` paths and binds them to schema nodes with
//! typed key values.

mod parser;
mod resolver;

pub use parser::{escape_value, parse_path, PathSegment};
pub use resolver::{KeyScope, ListKeys, PathElem, PathResolver, ResolvedPath};
