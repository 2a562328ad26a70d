//! Key-value store layer
//!
//! Rows are flat field maps addressed by database, table and key. The
//! engine sees the store only through [`KvStore`]; [`InMemoryStore`] is the
//! bundled backend and [`PendingView`] overlays an uncommitted plan.

mod backend;
mod errors;
mod key;
mod memory;
mod overlay;
mod value;

pub use backend::{KvStore, MutationOp, ReadRequest, RowSet, TableMutation};
pub use errors::{StoreError, StoreResult};
pub use key::{DbKey, RowRef, TableRef};
pub use memory::InMemoryStore;
pub use overlay::PendingView;
pub use value::FieldMap;
