//! Hook traits
//!
//! Hooks are bound to schema nodes by name and resolved through the
//! [`HookRegistry`](super::HookRegistry). Every hook is a pure function of
//! its context; side effects are expressed as returned mutations.

use serde_json::Value;

use super::context::XfmrContext;
use crate::errors::XlateResult;
use crate::schema::LeafType;
use crate::store::{FieldMap, TableMutation, TableRef};

/// Chooses the table(s) backing a list
pub trait TableNameHook: Send + Sync {
    /// With the list's keys bound in `ctx.scope`, exactly one table;
    /// otherwise every candidate table.
    fn tables(&self, ctx: &XfmrContext) -> XlateResult<Vec<String>>;
}

/// Builds and parses row keys of a list
pub trait KeyHook: Send + Sync {
    /// Row key for the list instance bound in `ctx.scope`
    fn to_db(&self, ctx: &XfmrContext) -> XlateResult<String>;

    /// Key leaf values encoded in `key`; `None` when the row does not
    /// belong to the enclosing instance in `ctx.scope`
    fn from_db(&self, ctx: &XfmrContext, key: &str) -> XlateResult<Option<Vec<(String, Value)>>>;
}

/// Fields to write and remove for one leaf
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    pub set: FieldMap,
    pub delete: Vec<String>,
}

impl FieldUpdate {
    pub fn set(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            set: FieldMap::with(field, value),
            delete: Vec::new(),
        }
    }

    pub fn delete(fields: &[&str]) -> Self {
        Self {
            set: FieldMap::new(),
            delete: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }
}

/// Translates one leaf to and from arbitrary fields of its row
pub trait FieldHook: Send + Sync {
    /// `value` is the canonical payload value, `None` when deleting
    fn to_db(&self, ctx: &XfmrContext, value: Option<&Value>) -> XlateResult<FieldUpdate>;

    /// Canonical leaf value from the row, `None` when absent
    fn from_db(&self, ctx: &XfmrContext, row: Option<&FieldMap>) -> XlateResult<Option<Value>>;

    /// Extra tables `from_db` consults through `ctx.store`
    fn reads(&self) -> Vec<TableRef> {
        Vec::new()
    }
}

/// Translates a whole subtree
pub trait SubtreeHook: Send + Sync {
    /// `payload` is the content of the subtree root node. `None` clears what
    /// the subtree owns in `ctx.scope`, narrowed to `ctx.path` when the
    /// request targets a node below the root.
    fn to_db(&self, ctx: &XfmrContext, payload: Option<&Value>) -> XlateResult<Vec<TableMutation>>;

    /// Content of the subtree root node in wire form
    fn from_db(&self, ctx: &XfmrContext) -> XlateResult<Option<Value>>;

    /// Tables `from_db` consults through `ctx.store`
    fn reads(&self) -> Vec<TableRef>;
}

/// Veto point fired before planning, for each node on the request path
pub trait PreHook: Send + Sync {
    fn check(&self, ctx: &XfmrContext) -> XlateResult<()>;
}

/// Fired after planning; may append or rewrite mutations
pub trait PostHook: Send + Sync {
    fn adjust(&self, ctx: &XfmrContext, mutations: &mut Vec<TableMutation>) -> XlateResult<()>;
}

/// Declarative value encoding of a leaf
pub trait FieldCodec: Send + Sync {
    fn encode(&self, value: &Value, ty: &LeafType) -> XlateResult<String>;
    fn decode(&self, text: &str, ty: &LeafType) -> XlateResult<Value>;
}
