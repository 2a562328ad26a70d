//! Query Filter
//!
//! `content`, `depth` and `fields` applied to the assembled content of a
//! Get target, in that order.

mod filter;
mod params;

pub use filter::QueryFilter;
pub use params::{ContentKind, QueryParameters};
