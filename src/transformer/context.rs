//! Request operation and the context handed to every hook

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::errors::XlateResult;
use crate::path::{KeyScope, ResolvedPath};
use crate::schema::{IndexedNode, NodeId, SchemaIndex};
use crate::store::{KvStore, RowRef};

/// Request operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Get,
    Create,
    Update,
    Replace,
    Delete,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Get => "GET",
            Operation::Create => "CREATE",
            Operation::Update => "UPDATE",
            Operation::Replace => "REPLACE",
            Operation::Delete => "DELETE",
        }
    }

    /// Create, Update and Replace carry a payload
    pub fn is_set(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update | Operation::Replace)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Everything a hook may consult
///
/// `store` is the committed store for Set-family requests and the read
/// snapshot for Get. `scope` holds the key values bound at `node`.
pub struct XfmrContext<'a> {
    pub oper: Operation,
    pub index: &'a SchemaIndex,
    pub config: &'a EngineConfig,
    pub store: &'a dyn KvStore,
    pub path: &'a ResolvedPath,
    pub node: NodeId,
    pub scope: &'a KeyScope,
    pub row: Option<&'a RowRef>,
}

impl<'a> XfmrContext<'a> {
    pub fn schema(&self) -> &'a IndexedNode {
        self.index.node(self.node)
    }

    /// The hook fires on the node the request targets
    pub fn is_target(&self) -> bool {
        self.path.target() == self.node
    }

    /// Bound key value rendered as store text
    pub fn key_text(&self, name: &str) -> Option<String> {
        self.scope.get(name).map(value_text)
    }

    pub fn key_separator(&self) -> XlateResult<&'a str> {
        self.config.key_separator(&self.schema().db)
    }

    pub fn list_separator(&self) -> &'a str {
        &self.config.leaf_list_separator
    }
}

/// Plain text of a scalar JSON value
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
