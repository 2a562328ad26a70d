//! Set planning
//!
//! Walks a JSON payload against the schema from the request target down and
//! emits row mutations:
//! - Create and Update merge; leaf-lists take the union with stored members
//! - Replace also clears owned data the payload leaves out and swaps
//!   leaf-lists wholesale
//! - rows of list instances on the way are ensured so attribute-less
//!   entries persist
//!
//! Subtree hooks own everything below their node: the payload is lifted to
//! the hook's level and handed over unchanged.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::plan::OperationPlan;
use crate::errors::{XlateError, XlateResult};
use crate::path::{KeyScope, ResolvedPath};
use crate::schema::{IndexedNode, NodeId, NodeKind, SchemaIndex};
use crate::store::{FieldMap, RowRef, TableMutation};
use crate::transformer::{FieldUpdate, Operation, XfmrChain};

/// Accumulates mutations for one request
pub struct Planner<'a> {
    pub(super) chain: &'a XfmrChain<'a>,
    pub(super) mutations: Vec<TableMutation>,
    ensured: HashSet<RowRef>,
}

impl<'a> Planner<'a> {
    pub fn new(chain: &'a XfmrChain<'a>) -> Self {
        Self {
            chain,
            mutations: Vec::new(),
            ensured: HashSet::new(),
        }
    }

    /// Plan a Create, Update or Replace of `payload` at the chain's path
    pub fn plan_set(chain: &'a XfmrChain<'a>, payload: &Value) -> XlateResult<OperationPlan> {
        let mut planner = Planner::new(chain);
        planner.set(payload)?;
        Ok(planner.finish())
    }

    pub fn finish(self) -> OperationPlan {
        OperationPlan {
            oper: self.chain.oper,
            path: self.chain.path.text.clone(),
            mutations: self.mutations,
        }
    }

    pub(super) fn index(&self) -> &'a SchemaIndex {
        self.chain.index
    }

    pub(super) fn path(&self) -> &'a ResolvedPath {
        self.chain.path
    }

    pub(super) fn node(&self, id: NodeId) -> &'a IndexedNode {
        self.chain.index.node(id)
    }

    pub(super) fn push(&mut self, mutation: TableMutation) {
        self.mutations.push(mutation);
    }

    /// Make sure `row` exists after commit, without touching its fields
    pub(super) fn ensure_row(&mut self, row: RowRef) {
        if self.ensured.insert(row.clone()) {
            self.push(TableMutation::upsert(&row, FieldMap::new()));
        }
    }

    pub(super) fn apply_update(&mut self, row: &RowRef, update: FieldUpdate) {
        if !update.set.is_empty() {
            self.push(TableMutation::upsert(row, update.set));
        }
        if !update.delete.is_empty() {
            self.push(TableMutation::delete_fields(row, update.delete));
        }
    }

    /// Hand a subtree to its hook; `None` clears everything it owns in scope
    pub(super) fn run_subtree(&mut self, root: NodeId, scope: &KeyScope, payload: Option<&Value>) -> XlateResult<()> {
        let name = self
            .node(root)
            .mapping
            .subtree_hook
            .as_deref()
            .ok_or_else(|| XlateError::internal(format!("{} has no subtree hook", self.node(root).xpath)))?;
        let enclosing = scope.enclosing(self.index(), root);
        let produced = {
            let ctx = self.chain.context(root, &enclosing, None);
            self.chain.hooks.subtree_hook(name)?.to_db(&ctx, payload)?
        };
        self.mutations.extend(produced);
        Ok(())
    }

    /// Committed row, if present
    pub(super) fn committed(&self, row: &RowRef) -> XlateResult<Option<FieldMap>> {
        Ok(self.chain.store.get_entry(&row.db, &row.table, &row.key)?)
    }

    fn set(&mut self, payload: &Value) -> XlateResult<()> {
        let path = self.path();
        let target = path.target();
        let node = self.node(target);

        if path.leaf_list_value.is_some() {
            return Err(
                XlateError::invalid_args("A leaf-list member path only accepts Delete").with_path(&path.text)
            );
        }
        if node.is_state() {
            return Err(XlateError::not_supported(format!("'{}' is read-only state data", node.name))
                .with_path(&path.text));
        }

        let body = unwrap_payload(self.index(), target, payload).map_err(|e| e.with_path(&path.text))?;
        let scope = path.scope();

        if let Some(root) = node.subtree_root {
            let lifted = lift_payload(self.index(), path, root, body)?;
            return self.run_subtree(root, &scope, Some(&lifted));
        }

        self.ensure_path_rows(&scope)?;

        let result = match node.kind {
            NodeKind::Container => self.set_container(target, body, &scope),
            NodeKind::List if path.is_instance(self.index()) => {
                let entry = single_entry(node, body)?;
                self.set_entry(target, entry, &scope)
            }
            NodeKind::List => self.set_list(target, body, &scope),
            NodeKind::Leaf => self.set_leaf(target, body, &scope),
            NodeKind::LeafList => self.set_leaf_list(target, body, &scope),
        };
        result.map_err(|e| if e.path().is_none() { e.with_path(&path.text) } else { e })
    }

    /// Rows of the list instances named by the path
    fn ensure_path_rows(&mut self, scope: &KeyScope) -> XlateResult<()> {
        let target = self.path().target();
        for bound in scope.lists() {
            if bound.list == target {
                // handled by set_entry, which also checks exclusivity
                continue;
            }
            let list_scope = scope.enclosing(self.index(), bound.list);
            if let Some(row) = self.chain.row_for(bound.list, &list_scope)? {
                self.ensure_row(row);
            }
        }
        Ok(())
    }

    /// Resolve a payload member name to a child node
    fn member(&self, parent: NodeId, name: &str) -> XlateResult<NodeId> {
        let (module, bare) = match name.split_once(':') {
            Some((m, n)) => (Some(m), n),
            None => (None, name),
        };
        let unknown = || {
            XlateError::invalid_args(format!(
                "Unknown element '{}' in '{}'",
                name,
                self.node(parent).name
            ))
        };
        let child = self.index().child(parent, bare).ok_or_else(unknown)?;
        if module.map_or(false, |m| m != self.node(child).module) {
            return Err(unknown());
        }
        Ok(child)
    }

    fn set_child(&mut self, child: NodeId, value: &Value, scope: &KeyScope) -> XlateResult<()> {
        let node = self.node(child);
        if node.is_state() {
            return Err(XlateError::invalid_args(format!(
                "'{}' is read-only state data and cannot be written",
                node.name
            )));
        }
        if node.mapping.subtree_hook.is_some() {
            return self.run_subtree(child, scope, Some(value));
        }
        match node.kind {
            NodeKind::Container => self.set_container(child, value, scope),
            NodeKind::List => self.set_list(child, value, scope),
            NodeKind::Leaf => self.set_leaf(child, value, scope),
            NodeKind::LeafList => self.set_leaf_list(child, value, scope),
        }
    }

    fn set_container(&mut self, id: NodeId, body: &Value, scope: &KeyScope) -> XlateResult<()> {
        let node = self.node(id);
        let obj = body
            .as_object()
            .ok_or_else(|| XlateError::invalid_args(format!("Expected an object for '{}'", node.name)))?;

        if node.mapping.table.is_some() || node.mapping.key.is_some() {
            if let Some(row) = self.chain.row_for(id, scope)? {
                self.ensure_row(row);
            }
        }

        let mut present = HashSet::new();
        for (name, value) in obj {
            let child = self.member(id, name)?;
            present.insert(child);
            self.set_child(child, value, scope)?;
        }

        if self.chain.oper == Operation::Replace {
            for child in &node.children {
                if !present.contains(child) {
                    self.clear_node(*child, scope, None)?;
                }
            }
        }
        Ok(())
    }

    fn set_list(&mut self, id: NodeId, body: &Value, scope: &KeyScope) -> XlateResult<()> {
        let node = self.node(id);
        let entries: Vec<&Value> = match body {
            Value::Array(items) => items.iter().collect(),
            Value::Object(_) => vec![body],
            _ => {
                return Err(XlateError::invalid_args(format!(
                    "Expected an array of entries for '{}'",
                    node.name
                )))
            }
        };

        let mut written = Vec::with_capacity(entries.len());
        for entry in entries {
            let keys = self.entry_keys(id, entry)?;
            let entry_scope = scope.with(id, keys.clone());
            self.set_entry(id, entry, &entry_scope)?;
            written.push(keys);
        }

        if self.chain.oper == Operation::Replace {
            for existing in self.chain.instances(id, scope)? {
                let keep = existing
                    .for_list(id)
                    .map_or(false, |bound| written.contains(&bound.values));
                if !keep {
                    self.delete_instance(id, &existing)?;
                }
            }
        }
        Ok(())
    }

    /// Typed key values of a payload list entry, in schema key order
    fn entry_keys(&self, list: NodeId, entry: &Value) -> XlateResult<Vec<(String, Value)>> {
        let node = self.node(list);
        let obj = entry
            .as_object()
            .ok_or_else(|| XlateError::invalid_args(format!("Expected an object entry in '{}'", node.name)))?;

        let mut values = Vec::with_capacity(node.keys.len());
        for key in &node.keys {
            let raw = member_value(obj, key)
                .ok_or_else(|| XlateError::invalid_args(format!("Missing key '{}' in '{}' entry", key, node.name)))?;
            values.push((key.clone(), self.check_key(list, key, raw)?));
        }
        Ok(values)
    }

    fn check_key(&self, list: NodeId, key: &str, raw: &Value) -> XlateResult<Value> {
        let leaf = self
            .index()
            .child(list, key)
            .ok_or_else(|| XlateError::internal(format!("{} lost key leaf '{}'", self.node(list).xpath, key)))?;
        self.node(leaf)
            .leaf_type()?
            .check(raw)
            .map_err(|e| XlateError::invalid_args(format!("Invalid value for key '{}': {}", key, e)))
    }

    /// Write one list entry; `scope` binds this list's keys
    fn set_entry(&mut self, list: NodeId, entry: &Value, scope: &KeyScope) -> XlateResult<()> {
        let node = self.node(list);
        let obj = entry
            .as_object()
            .ok_or_else(|| XlateError::invalid_args(format!("Expected an object entry in '{}'", node.name)))?;
        let bound = scope
            .for_list(list)
            .ok_or_else(|| XlateError::internal(format!("keys of {} are not bound", node.xpath)))?
            .values
            .clone();

        if let Some(row) = self.chain.row_for(list, scope)? {
            if self.chain.oper == Operation::Create
                && node.mapping.create_exclusive
                && self.committed(&row)?.is_some()
            {
                return Err(XlateError::already_exists(format!(
                    "Entry {} already exists in '{}'",
                    describe_keys(&bound),
                    node.name
                )));
            }
            self.ensure_row(row);
        }

        let mut present = HashSet::new();
        for (name, value) in obj {
            let child = self.member(list, name)?;
            present.insert(child);
            let child_name = &self.node(child).name;
            if node.is_key(child_name) {
                let given = self.check_key(list, child_name, value)?;
                let expected = bound.iter().find(|(k, _)| k == child_name).map(|(_, v)| v);
                if expected != Some(&given) {
                    return Err(XlateError::invalid_args(format!(
                        "Key '{}' in the payload does not match the path",
                        child_name
                    )));
                }
                continue;
            }
            self.set_child(child, value, scope)?;
        }

        if self.chain.oper == Operation::Replace {
            for child in &node.children {
                if !present.contains(child) && !node.is_key(&self.node(*child).name) {
                    self.clear_node(*child, scope, None)?;
                }
            }
        }
        Ok(())
    }

    fn set_leaf(&mut self, id: NodeId, value: &Value, scope: &KeyScope) -> XlateResult<()> {
        let node = self.node(id);
        let canonical = node
            .leaf_type()?
            .check(value)
            .map_err(|e| XlateError::invalid_args(format!("Invalid value for '{}': {}", node.name, e)))?;

        if let Some(key) = self.bound_key_name(id) {
            return match scope.get(key) {
                Some(bound) if *bound == canonical => Ok(()),
                Some(_) => Err(XlateError::invalid_args(format!(
                    "'{}' must match key '{}' of the entry",
                    node.name, key
                ))),
                None => Err(XlateError::invalid_args(format!(
                    "'{}' cannot be set without its list key",
                    node.name
                ))),
            };
        }

        let row = self.require_row(id, scope)?;
        if let Some(name) = &node.mapping.field_hook {
            let update = {
                let ctx = self.chain.context(id, scope, Some(&row));
                self.chain.hooks.field_hook(name)?.to_db(&ctx, Some(&canonical))?
            };
            self.apply_update(&row, update);
            return Ok(());
        }

        let field = leaf_field(node)?;
        let text = self.chain.encode_leaf(id, &canonical)?;
        self.push(TableMutation::upsert(&row, FieldMap::with(field, text)));
        Ok(())
    }

    fn set_leaf_list(&mut self, id: NodeId, value: &Value, scope: &KeyScope) -> XlateResult<()> {
        let node = self.node(id);
        let ty = node.leaf_type()?;
        let items = match value {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        };
        let mut canonical: Vec<Value> = Vec::with_capacity(items.len());
        for item in &items {
            let c = ty
                .check(item)
                .map_err(|e| XlateError::invalid_args(format!("Invalid value for '{}': {}", node.name, e)))?;
            if !canonical.contains(&c) {
                canonical.push(c);
            }
        }

        let row = self.require_row(id, scope)?;
        if let Some(name) = &node.mapping.field_hook {
            let update = {
                let ctx = self.chain.context(id, scope, Some(&row));
                self.chain
                    .hooks
                    .field_hook(name)?
                    .to_db(&ctx, Some(&Value::Array(canonical)))?
            };
            self.apply_update(&row, update);
            return Ok(());
        }

        let field = leaf_field(node)?;
        let separator = self.chain.config.leaf_list_separator.as_str();
        let stored = self.committed(&row)?;
        let mut members = self.chain.encode_members(id, &canonical)?;
        if let Some(bad) = members.iter().find(|m| m.contains(separator)) {
            return Err(XlateError::invalid_args(format!(
                "Member '{}' of '{}' contains the list separator '{}'",
                bad, node.name, separator
            )));
        }

        if self.chain.oper != Operation::Replace {
            let mut merged = stored
                .as_ref()
                .map(|r| r.get_list(field, separator))
                .unwrap_or_default();
            for m in members {
                if !merged.contains(&m) {
                    merged.push(m);
                }
            }
            members = merged;
        }

        if members.is_empty() {
            if stored.map_or(false, |r| r.contains(field)) {
                self.push(TableMutation::delete_fields(&row, vec![field.to_string()]));
            }
            return Ok(());
        }

        let mut fields = FieldMap::new();
        fields.set_list(field, &members, separator);
        self.push(TableMutation::upsert(&row, fields));
        Ok(())
    }

    /// Key a leaf mirrors: `from_key`, or its own name when it is a list key
    pub(super) fn bound_key_name(&self, id: NodeId) -> Option<&'a str> {
        let node = self.node(id);
        if let Some(key) = node.mapping.from_key.as_deref() {
            return Some(key);
        }
        let parent = self.node(node.parent?);
        (parent.is_list() && parent.is_key(&node.name)).then_some(node.name.as_str())
    }

    pub(super) fn require_row(&self, id: NodeId, scope: &KeyScope) -> XlateResult<RowRef> {
        self.chain
            .row_for(id, scope)?
            .ok_or_else(|| XlateError::internal(format!("{} maps to no table", self.node(id).xpath)))
    }
}

pub(super) fn leaf_field(node: &IndexedNode) -> XlateResult<&str> {
    node.field
        .as_deref()
        .ok_or_else(|| XlateError::internal(format!("{} has no field", node.xpath)))
}

/// Value of a member named `name`, with or without a module prefix
fn member_value<'v>(obj: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
    obj.iter()
        .find(|(k, _)| k.rsplit_once(':').map_or(k.as_str(), |(_, n)| n) == name)
        .map(|(_, v)| v)
}

fn describe_keys(values: &[(String, Value)]) -> String {
    values
        .iter()
        .map(|(k, v)| format!("[{}={}]", k, crate::transformer::value_text(v)))
        .collect()
}

/// Content of a payload `{"[module:]target": content}`
fn unwrap_payload<'v>(index: &SchemaIndex, target: NodeId, payload: &'v Value) -> XlateResult<&'v Value> {
    let node = index.node(target);
    let obj = payload
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| {
            XlateError::invalid_args(format!("Payload must be an object with the single member '{}'", node.name))
        })?;

    let (name, content) = obj
        .iter()
        .next()
        .ok_or_else(|| XlateError::invalid_args("Empty payload"))?;
    let matches = match name.split_once(':') {
        Some((module, bare)) => module == node.module && bare == node.name,
        None => *name == node.name,
    };
    if !matches {
        return Err(XlateError::invalid_args(format!(
            "Payload member '{}' does not match the target '{}'",
            name, node.name
        )));
    }
    Ok(content)
}

/// The one entry of a list-instance payload
fn single_entry<'v>(node: &IndexedNode, body: &'v Value) -> XlateResult<&'v Value> {
    match body {
        Value::Array(items) if items.len() == 1 => Ok(&items[0]),
        Value::Object(_) => Ok(body),
        _ => Err(XlateError::invalid_args(format!(
            "Expected exactly one '{}' entry for a list instance",
            node.name
        ))),
    }
}

/// Re-wrap target content as the content of subtree root `root`
pub(super) fn lift_payload(index: &SchemaIndex, path: &ResolvedPath, root: NodeId, body: &Value) -> XlateResult<Value> {
    let mut value = body.clone();
    let mut is_target = true;

    for elem in path.elems.iter().rev() {
        let node = index.node(elem.node);
        let wrapped_as_list = node.is_list() && !elem.keys.is_empty();

        if wrapped_as_list {
            let mut entry = match (is_target, value) {
                (true, Value::Array(mut items)) if items.len() == 1 => items.remove(0),
                (_, other) => other,
            };
            let obj = entry
                .as_object_mut()
                .ok_or_else(|| XlateError::invalid_args(format!("Expected an object entry in '{}'", node.name)))?;
            for (key, v) in &elem.keys {
                if member_value(obj, key).is_none() {
                    let key_leaf = index
                        .child(elem.node, key)
                        .ok_or_else(|| XlateError::internal(format!("{} lost key leaf '{}'", node.xpath, key)))?;
                    obj.insert(key.clone(), index.node(key_leaf).leaf_type()?.render(v));
                }
            }
            value = entry;
        }

        if elem.node == root {
            return Ok(value);
        }
        let content = if wrapped_as_list { Value::Array(vec![value]) } else { value };
        let mut parent = Map::new();
        parent.insert(node.name.clone(), content);
        value = Value::Object(parent);
        is_target = false;
    }

    Err(XlateError::internal(format!(
        "{} is not on the request path",
        index.node(root).xpath
    )))
}
