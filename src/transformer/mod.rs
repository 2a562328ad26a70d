//! Transformer Chain
//!
//! Default mapping plus pluggable hooks translating between schema nodes
//! and table rows:
//! - table-name hooks choose a list's table
//! - key hooks build and parse row keys
//! - field hooks and codecs translate leaf values
//! - subtree hooks take over whole subtrees
//! - pre hooks veto requests, post hooks adjust the finished plan

mod builtin;
mod chain;
mod codec;
mod context;
mod hooks;
mod keys;
mod registry;

pub use builtin::{ClearOnLastRow, DenyOperations, KeyedTableHook, TableRule};
pub use chain::XfmrChain;
pub use codec::{BoolTokens, IdentityCodec, ValueMapCodec};
pub use context::{value_text, Operation, XfmrContext};
pub use hooks::{FieldCodec, FieldHook, FieldUpdate, KeyHook, PostHook, PreHook, SubtreeHook, TableNameHook};
pub use keys::{decode_components, encode_components, CompositeKey};
pub use registry::HookRegistry;
