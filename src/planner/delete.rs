//! Delete planning
//!
//! - leaf: its field is removed; a schema default shows again on Get
//! - leaf-list member: the member is removed from the stored list
//! - container: every owned leaf below it is cleared
//! - list instance: nested owned data first, then the row
//! - whole list: every instance in scope
//!
//! Instances named by the path must exist; fields need not.

use super::plan::OperationPlan;
use super::to_db::{leaf_field, Planner};
use crate::errors::{XlateError, XlateResult};
use crate::path::KeyScope;
use crate::schema::{NodeId, NodeKind};
use crate::store::{FieldMap, RowRef, TableMutation};
use crate::transformer::XfmrChain;

impl<'a> Planner<'a> {
    /// Plan a Delete at the chain's path
    pub fn plan_delete(chain: &'a XfmrChain<'a>) -> XlateResult<OperationPlan> {
        let mut planner = Planner::new(chain);
        let path_text = chain.path.text.clone();
        planner
            .delete()
            .map_err(|e| if e.path().is_none() { e.with_path(path_text) } else { e })?;
        Ok(planner.finish())
    }

    fn delete(&mut self) -> XlateResult<()> {
        let path = self.path();
        let target = path.target();
        let node = self.node(target);
        let scope = path.scope();

        if node.is_state() {
            return Err(XlateError::not_supported(format!(
                "'{}' is read-only state data",
                node.name
            )));
        }
        if let Some(root) = node.subtree_root {
            return self.run_subtree(root, &scope, None);
        }

        self.require_path_rows(&scope)?;

        match node.kind {
            NodeKind::Leaf => {
                if self.bound_key_name(target).is_some() {
                    return Err(XlateError::invalid_args(format!(
                        "Key leaf '{}' cannot be deleted",
                        node.name
                    )));
                }
                self.delete_leaf(target, &scope, true)
            }
            NodeKind::LeafList => match &path.leaf_list_value {
                Some(member) => self.delete_member(target, &scope, member),
                None => self.delete_leaf(target, &scope, true),
            },
            NodeKind::Container => self.clear_node(target, &scope, None),
            NodeKind::List if path.is_instance(self.index()) => self.delete_instance(target, &scope),
            NodeKind::List => {
                for instance in self.chain.instances(target, &scope)? {
                    self.delete_instance(target, &instance)?;
                }
                Ok(())
            }
        }
    }

    /// Every list instance named by the path must have its row
    fn require_path_rows(&self, scope: &KeyScope) -> XlateResult<()> {
        for bound in scope.lists() {
            let list_scope = scope.enclosing(self.index(), bound.list);
            if let Some(row) = self.chain.row_for(bound.list, &list_scope)? {
                if self.committed(&row)?.is_none() {
                    return Err(XlateError::resource_not_found());
                }
            }
        }
        Ok(())
    }

    /// Remove a leaf or whole leaf-list field; `strict` requires the row
    fn delete_leaf(&mut self, id: NodeId, scope: &KeyScope, strict: bool) -> XlateResult<()> {
        let node = self.node(id);
        let Some(row) = self.chain.row_for(id, scope)? else {
            return Ok(());
        };
        let stored = self.committed(&row)?;
        if stored.is_none() && strict {
            return Err(XlateError::resource_not_found());
        }

        if let Some(name) = &node.mapping.field_hook {
            let update = {
                let ctx = self.chain.context(id, scope, Some(&row));
                self.chain.hooks.field_hook(name)?.to_db(&ctx, None)?
            };
            self.apply_update(&row, update);
            return Ok(());
        }

        let field = leaf_field(node)?;
        if stored.map_or(false, |r| r.contains(field)) {
            self.push(TableMutation::delete_fields(&row, vec![field.to_string()]));
        }
        Ok(())
    }

    /// Remove one member of a leaf-list
    fn delete_member(&mut self, id: NodeId, scope: &KeyScope, member: &serde_json::Value) -> XlateResult<()> {
        let node = self.node(id);
        if node.mapping.field_hook.is_some() {
            return Err(XlateError::not_supported(format!(
                "Deleting single members of '{}' is not supported",
                node.name
            )));
        }
        let row = self.require_row(id, scope)?;
        let stored = self.committed(&row)?.ok_or_else(XlateError::resource_not_found)?;

        let field = leaf_field(node)?;
        let separator = self.chain.config.leaf_list_separator.as_str();
        let encoded = self.chain.encode_leaf(id, member)?;
        let mut members = stored.get_list(field, separator);
        let before = members.len();
        members.retain(|m| *m != encoded);
        if members.len() == before {
            return Err(XlateError::resource_not_found());
        }

        if members.is_empty() {
            self.push(TableMutation::delete_fields(&row, vec![field.to_string()]));
        } else {
            let mut fields = FieldMap::new();
            fields.set_list(field, &members, separator);
            self.push(TableMutation::upsert(&row, fields));
        }
        Ok(())
    }

    /// Clear data owned below `id` without requiring any of it to exist.
    /// Leaves stored in `dying` are skipped since that row goes anyway.
    pub(super) fn clear_node(&mut self, id: NodeId, scope: &KeyScope, dying: Option<&RowRef>) -> XlateResult<()> {
        let node = self.node(id);
        if !node.has_config {
            return Ok(());
        }
        if node.mapping.subtree_hook.is_some() {
            return self.run_subtree(id, scope, None);
        }

        match node.kind {
            NodeKind::Container => {
                for child in &node.children {
                    self.clear_node(*child, scope, dying)?;
                }
                Ok(())
            }
            NodeKind::List => {
                for instance in self.chain.instances(id, scope)? {
                    self.delete_instance(id, &instance)?;
                }
                Ok(())
            }
            NodeKind::Leaf | NodeKind::LeafList => {
                if node.is_state() || self.bound_key_name(id).is_some() || self.is_shared(id) {
                    return Ok(());
                }
                if dying.is_some() && self.chain.row_for(id, scope)?.as_ref() == dying {
                    return Ok(());
                }
                self.delete_leaf(id, scope, false)
            }
        }
    }

    /// Leaf stored in a fixed row outside its list, shared by all entries
    fn is_shared(&self, id: NodeId) -> bool {
        let node = self.node(id);
        node.mapping.key.is_some() && self.index().key_owner(id).is_some()
    }

    /// Delete one list instance: nested data, then its row
    pub(super) fn delete_instance(&mut self, list: NodeId, scope: &KeyScope) -> XlateResult<()> {
        let node = self.node(list);
        let row = self.chain.row_for(list, scope)?;

        for child in &node.children {
            self.clear_node(*child, scope, row.as_ref())?;
        }
        if let Some(row) = row {
            if self.committed(&row)?.is_some() {
                self.push(TableMutation::delete_row(&row));
            }
        }
        Ok(())
    }
}
