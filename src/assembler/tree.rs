//! Rows to tree
//!
//! Walks the schema from the request target down, reading fields from the
//! Get snapshot held by the chain. Values come out in wire form: identities
//! module-qualified, names module-qualified at module boundaries, declared
//! defaults filled in for absent leaves.

use serde_json::{Map, Value};

use super::navigate::descend;
use crate::errors::{XlateError, XlateResult};
use crate::path::KeyScope;
use crate::schema::{NodeId, NodeKind};
use crate::transformer::XfmrChain;

/// Builds the tree for one Get
pub struct TreeAssembler<'a> {
    chain: &'a XfmrChain<'a>,
}

impl<'a> TreeAssembler<'a> {
    pub fn new(chain: &'a XfmrChain<'a>) -> Self {
        Self { chain }
    }

    /// Content of the request target; `None` when it holds no data.
    ///
    /// Leaves without a value or default and missing list instances are
    /// `NotFound`; unmapped state subtrees are `NotSupported`.
    pub fn assemble(&self) -> XlateResult<Option<Value>> {
        let index = self.chain.index;
        let path = self.chain.path;
        let target = path.target();
        let node = index.node(target);
        let scope = path.scope();

        if !node.retrievable {
            return Err(XlateError::not_implemented().with_path(&path.text));
        }

        let content = match node.subtree_root {
            Some(root) => {
                let ctx_scope = scope.enclosing(index, root);
                let ctx = self.chain.context(root, &ctx_scope, None);
                let name = node_subtree_hook(self.chain, root)?;
                let produced = self.chain.hooks.subtree_hook(name)?.from_db(&ctx)?;
                match produced {
                    Some(value) => descend(index, path, root, value)?,
                    None => None,
                }
            }
            None => {
                self.require_instances(&scope)?;
                self.content(target, &scope)?
            }
        };

        match node.kind {
            NodeKind::Leaf if content.is_none() => Err(XlateError::resource_not_found().with_path(&path.text)),
            NodeKind::List if path.is_instance(index) && content.is_none() => {
                Err(XlateError::resource_not_found().with_path(&path.text))
            }
            NodeKind::LeafList => match (&path.leaf_list_value, content) {
                (Some(member), Some(Value::Array(items))) => {
                    let wanted = node.leaf_type()?.render(member);
                    if items.contains(&wanted) {
                        Ok(Some(Value::Array(vec![wanted])))
                    } else {
                        Err(XlateError::resource_not_found().with_path(&path.text))
                    }
                }
                (Some(_), _) | (None, None) => Err(XlateError::resource_not_found().with_path(&path.text)),
                (None, content) => Ok(content),
            },
            _ => Ok(content),
        }
    }

    /// Every list instance named by the path must exist in the snapshot
    fn require_instances(&self, scope: &KeyScope) -> XlateResult<()> {
        for bound in scope.lists() {
            let list_scope = scope.enclosing(self.chain.index, bound.list);
            if let Some(row) = self.chain.row_for(bound.list, &list_scope)? {
                if self.chain.store.get_entry(&row.db, &row.table, &row.key)?.is_none() {
                    return Err(XlateError::resource_not_found().with_path(&self.chain.path.text));
                }
            }
        }
        Ok(())
    }

    /// Wire-form content of `id` with the keys in `scope`
    pub fn content(&self, id: NodeId, scope: &KeyScope) -> XlateResult<Option<Value>> {
        let node = self.chain.index.node(id);
        if !node.retrievable {
            return Ok(None);
        }
        if let Some(name) = &node.mapping.subtree_hook {
            let ctx_scope = scope.enclosing(self.chain.index, id);
            let ctx = self.chain.context(id, &ctx_scope, None);
            return self.chain.hooks.subtree_hook(name)?.from_db(&ctx);
        }

        match node.kind {
            NodeKind::Container => self.children(id, scope, &mut Map::new()),
            NodeKind::List if scope.is_bound(id) => self.entry(id, scope),
            NodeKind::List => {
                let mut entries = Vec::new();
                for instance in self.chain.instances(id, scope)? {
                    if let Some(entry) = self.entry(id, &instance)? {
                        entries.push(entry);
                    }
                }
                Ok((!entries.is_empty()).then_some(Value::Array(entries)))
            }
            NodeKind::Leaf => self.leaf(id, scope),
            NodeKind::LeafList => self.leaf_list(id, scope),
        }
    }

    fn children(&self, id: NodeId, scope: &KeyScope, out: &mut Map<String, Value>) -> XlateResult<Option<Value>> {
        let index = self.chain.index;
        for child in &index.node(id).children {
            if out.contains_key(&index.qualified_name(*child)) {
                continue;
            }
            if let Some(value) = self.content(*child, scope)? {
                out.insert(index.qualified_name(*child), value);
            }
        }
        Ok((!out.is_empty()).then(|| Value::Object(std::mem::take(out))))
    }

    /// One list entry: key leaves first, then everything else
    fn entry(&self, list: NodeId, scope: &KeyScope) -> XlateResult<Option<Value>> {
        let index = self.chain.index;
        if let Some(row) = self.chain.row_for(list, scope)? {
            if self.chain.store.get_entry(&row.db, &row.table, &row.key)?.is_none() {
                return Ok(None);
            }
        }

        let bound = scope
            .for_list(list)
            .ok_or_else(|| XlateError::internal(format!("keys of {} are not bound", index.node(list).xpath)))?;
        let mut out = Map::new();
        for (key, value) in &bound.values {
            let leaf = index
                .child(list, key)
                .ok_or_else(|| XlateError::internal(format!("{} lost key leaf '{}'", index.node(list).xpath, key)))?;
            out.insert(index.qualified_name(leaf), index.node(leaf).leaf_type()?.render(value));
        }
        self.children(list, scope, &mut out)
    }

    fn leaf(&self, id: NodeId, scope: &KeyScope) -> XlateResult<Option<Value>> {
        let node = self.chain.index.node(id);
        let ty = node.leaf_type()?;

        if let Some(key) = node.mapping.from_key.as_deref() {
            return Ok(scope.get(key).map(|v| ty.render(v)));
        }

        let row = self.chain.row_for(id, scope)?;
        let stored = match &row {
            Some(r) => self.chain.store.get_entry(&r.db, &r.table, &r.key)?,
            None => None,
        };

        let value = if let Some(name) = &node.mapping.field_hook {
            let ctx = self.chain.context(id, scope, row.as_ref());
            self.chain.hooks.field_hook(name)?.from_db(&ctx, stored.as_ref())?
        } else {
            match (stored.as_ref(), &node.field) {
                (Some(fields), Some(field)) => match fields.get(field) {
                    Some(text) => Some(self.chain.decode_leaf(id, text)?),
                    None => None,
                },
                _ => None,
            }
        };

        Ok(value.or_else(|| node.default.clone()).map(|v| ty.render(&v)))
    }

    fn leaf_list(&self, id: NodeId, scope: &KeyScope) -> XlateResult<Option<Value>> {
        let node = self.chain.index.node(id);
        let ty = node.leaf_type()?;
        let row = self.chain.row_for(id, scope)?;
        let stored = match &row {
            Some(r) => self.chain.store.get_entry(&r.db, &r.table, &r.key)?,
            None => None,
        };

        let members: Vec<Value> = if let Some(name) = &node.mapping.field_hook {
            let ctx = self.chain.context(id, scope, row.as_ref());
            match self.chain.hooks.field_hook(name)?.from_db(&ctx, stored.as_ref())? {
                Some(Value::Array(items)) => items,
                Some(single) => vec![single],
                None => Vec::new(),
            }
        } else {
            match (stored.as_ref(), &node.field) {
                (Some(fields), Some(field)) => {
                    let texts = fields.get_list(field, &self.chain.config.leaf_list_separator);
                    self.chain.decode_members(id, &texts)?
                }
                _ => Vec::new(),
            }
        };

        if members.is_empty() {
            return Ok(None);
        }
        Ok(Some(Value::Array(members.iter().map(|v| ty.render(v)).collect())))
    }
}

fn node_subtree_hook<'c>(chain: &'c XfmrChain, root: NodeId) -> XlateResult<&'c str> {
    chain
        .index
        .node(root)
        .mapping
        .subtree_hook
        .as_deref()
        .ok_or_else(|| XlateError::internal(format!("{} has no subtree hook", chain.index.node(root).xpath)))
}
