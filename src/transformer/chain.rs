//! Transformer chain
//!
//! Resolves where a node lives in the store: its table (static or chosen
//! by a table hook), its row key (default joined keys or a key hook) and
//! the text form of its values (default or named codec). Planner and
//! assembler both go through this type so reads and writes agree.

use serde_json::Value;

use super::context::{Operation, XfmrContext};
use super::registry::HookRegistry;
use crate::config::EngineConfig;
use crate::errors::{XlateError, XlateResult};
use crate::path::{KeyScope, ResolvedPath};
use crate::schema::{NodeId, SchemaIndex};
use crate::store::{DbKey, KvStore, RowRef};

/// Mapping resolution for one request
pub struct XfmrChain<'a> {
    pub index: &'a SchemaIndex,
    pub hooks: &'a HookRegistry,
    pub config: &'a EngineConfig,
    /// Committed store for writes, read snapshot for Get
    pub store: &'a dyn KvStore,
    pub oper: Operation,
    pub path: &'a ResolvedPath,
}

impl<'a> XfmrChain<'a> {
    pub fn context<'b>(&'b self, node: NodeId, scope: &'b KeyScope, row: Option<&'b RowRef>) -> XfmrContext<'b> {
        XfmrContext {
            oper: self.oper,
            index: self.index,
            config: self.config,
            store: self.store,
            path: self.path,
            node,
            scope,
            row,
        }
    }

    /// Nearest ancestor-or-self declaring the table hook in effect at `node`
    fn table_hook_owner(&self, node: NodeId) -> Option<NodeId> {
        for id in self.index.lineage(node).into_iter().rev() {
            let mapping = &self.index.node(id).mapping;
            if mapping.table.is_some() {
                return None;
            }
            if mapping.table_hook.is_some() {
                return Some(id);
            }
        }
        None
    }

    /// Tables backing `node`; empty when the node has no table mapping
    pub fn tables(&self, node: NodeId, scope: &KeyScope) -> XlateResult<Vec<String>> {
        let schema = self.index.node(node);
        if let Some(table) = &schema.table {
            return Ok(vec![table.clone()]);
        }
        if let Some(name) = &schema.table_hook {
            let owner = self
                .table_hook_owner(node)
                .ok_or_else(|| XlateError::internal(format!("{} lost its table hook", schema.xpath)))?;
            let ctx = self.context(owner, scope, None);
            return self.hooks.table_hook(name)?.tables(&ctx);
        }
        Ok(Vec::new())
    }

    /// Row key of the list instance bound in `scope`
    pub fn list_row_key(&self, list: NodeId, scope: &KeyScope) -> XlateResult<String> {
        self.row_key_in(list, scope, &self.index.node(list).db)
    }

    /// Row key of a list instance as joined in `db`
    fn row_key_in(&self, list: NodeId, scope: &KeyScope, db: &str) -> XlateResult<String> {
        let schema = self.index.node(list);
        if let Some(name) = &schema.mapping.key_hook {
            let ctx = self.context(list, scope, None);
            return self.hooks.key_hook(name)?.to_db(&ctx);
        }

        let mut key = DbKey::default();
        for l in self.index.list_lineage(list) {
            let bound = scope.for_list(l).ok_or_else(|| {
                XlateError::internal(format!("keys of {} are not bound", self.index.node(l).xpath))
            })?;
            for (name, value) in &bound.values {
                key.push(self.encode_leaf(self.key_leaf(l, name)?, value)?);
            }
        }
        Ok(key.join(self.config.key_separator(db)?))
    }

    /// Key leaf values of a row of `list`, or `None` when the row belongs
    /// to another parent instance or does not parse
    pub fn decode_list_key(&self, list: NodeId, scope: &KeyScope, key: &str) -> XlateResult<Option<Vec<(String, Value)>>> {
        let schema = self.index.node(list);
        if let Some(name) = &schema.mapping.key_hook {
            let ctx = self.context(list, scope, None);
            return self.hooks.key_hook(name)?.from_db(&ctx, key);
        }

        let mut outer = Vec::new();
        for l in self.index.list_lineage(list).into_iter().filter(|l| *l != list) {
            let bound = scope.for_list(l).ok_or_else(|| {
                XlateError::internal(format!("keys of {} are not bound", self.index.node(l).xpath))
            })?;
            for (name, value) in &bound.values {
                outer.push(self.encode_leaf(self.key_leaf(l, name)?, value)?);
            }
        }

        let parsed = DbKey::parse(key, self.config.key_separator(&schema.db)?);
        if parsed.len() != outer.len() + schema.keys.len() || parsed.comps()[..outer.len()] != outer[..] {
            return Ok(None);
        }

        let mut values = Vec::with_capacity(schema.keys.len());
        for (i, name) in schema.keys.iter().enumerate() {
            let text = &parsed.comps()[outer.len() + i];
            match self.decode_leaf(self.key_leaf(list, name)?, text) {
                Ok(v) => values.push((name.clone(), v)),
                Err(_) => return Ok(None),
            }
        }
        Ok(Some(values))
    }

    /// Row holding the fields of `node`; `None` when the node maps to no table
    pub fn row_for(&self, node: NodeId, scope: &KeyScope) -> XlateResult<Option<RowRef>> {
        let schema = self.index.node(node);
        let tables = self.tables(node, scope)?;
        let Some(table) = tables.into_iter().next() else {
            return Ok(None);
        };

        let key = match &schema.row_key {
            Some(k) => k.clone(),
            None => {
                let owner = self.index.key_owner(node).ok_or_else(|| {
                    XlateError::internal(format!("{} has a table but no row key", schema.xpath))
                })?;
                self.row_key_in(owner, scope, &schema.db)?
            }
        };
        Ok(Some(RowRef::new(schema.db.clone(), table, key)))
    }

    /// Stored instances of `list` under the lists bound in `scope`
    pub fn instances(&self, list: NodeId, scope: &KeyScope) -> XlateResult<Vec<KeyScope>> {
        let schema = self.index.node(list);
        let mut out = Vec::new();
        for table in self.tables(list, scope)? {
            for key in self.store.get_keys(&schema.db, &table)? {
                if let Some(values) = self.decode_list_key(list, scope, &key)? {
                    let instance = scope.with(list, values);
                    // a table hook may route this key value elsewhere
                    let routed = self.row_for(list, &instance)?;
                    if routed.map_or(true, |r| r.table == table) {
                        out.push(instance);
                    }
                }
            }
        }
        Ok(out)
    }

    fn key_leaf(&self, list: NodeId, name: &str) -> XlateResult<NodeId> {
        self.index.child(list, name).ok_or_else(|| {
            XlateError::internal(format!("{} has no key leaf '{}'", self.index.node(list).xpath, name))
        })
    }

    /// Store text of a canonical scalar value
    pub fn encode_leaf(&self, node: NodeId, value: &Value) -> XlateResult<String> {
        let schema = self.index.node(node);
        let ty = schema.leaf_type()?;
        match &schema.mapping.codec {
            Some(name) => self.hooks.codec(name)?.encode(value, ty),
            None => Ok(ty.to_db_text(value)),
        }
    }

    /// Canonical value of store text
    pub fn decode_leaf(&self, node: NodeId, text: &str) -> XlateResult<Value> {
        let schema = self.index.node(node);
        let ty = schema.leaf_type()?;
        match &schema.mapping.codec {
            Some(name) => self.hooks.codec(name)?.decode(text, ty),
            None => ty.parse_text(text).map_err(|e| {
                XlateError::internal(format!("{}: stored value '{}' is invalid: {}", schema.xpath, text, e))
            }),
        }
    }

    /// Encoded members of a leaf-list
    pub fn encode_members(&self, node: NodeId, values: &[Value]) -> XlateResult<Vec<String>> {
        values.iter().map(|v| self.encode_leaf(node, v)).collect()
    }

    pub fn decode_members(&self, node: NodeId, members: &[String]) -> XlateResult<Vec<Value>> {
        members.iter().map(|m| self.decode_leaf(node, m)).collect()
    }
}
