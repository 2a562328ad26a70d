//! Tree Assembler
//!
//! Converts the rows of a Get snapshot back into the hierarchical JSON
//! representation, injecting declared defaults for absent leaves.

mod navigate;
mod tree;

pub use navigate::{descend, member, wrap};
pub use tree::TreeAssembler;
