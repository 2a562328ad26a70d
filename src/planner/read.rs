//! Read planning
//!
//! Collects every table a Get at the target may touch: tables of the
//! target's ancestors (instance checks), of the target subtree, plus the
//! tables hooks declare they read. Reads are whole tables so one batch
//! gives a consistent snapshot.

use super::plan::ReadPlan;
use crate::errors::XlateResult;
use crate::path::KeyScope;
use crate::schema::NodeId;
use crate::store::TableRef;
use crate::transformer::XfmrChain;

/// Tables needed to answer a Get at `target`
pub fn plan_reads(chain: &XfmrChain, target: NodeId, scope: &KeyScope) -> XlateResult<ReadPlan> {
    let index = chain.index;
    let mut plan = ReadPlan::new();

    if let Some(root) = index.node(target).subtree_root {
        add_subtree_reads(chain, root, &mut plan)?;
    }

    for id in index.lineage(target) {
        add_node_tables(chain, id, scope, &mut plan)?;
    }

    let mut skip_below: Vec<NodeId> = Vec::new();
    for id in index.descendants(target) {
        if skip_below.iter().any(|root| index.is_ancestor_or_self(*root, id)) {
            continue;
        }
        let node = index.node(id);
        if node.mapping.subtree_hook.is_some() {
            add_subtree_reads(chain, id, &mut plan)?;
            skip_below.push(id);
            continue;
        }
        add_node_tables(chain, id, scope, &mut plan)?;
    }
    Ok(plan)
}

fn add_node_tables(chain: &XfmrChain, id: NodeId, scope: &KeyScope, plan: &mut ReadPlan) -> XlateResult<()> {
    let node = chain.index.node(id);
    if node.subtree_root.is_some() {
        return Ok(());
    }
    for table in chain.tables(id, scope)? {
        plan.add(TableRef::new(node.db.clone(), table));
    }
    if let Some(name) = &node.mapping.field_hook {
        for table in chain.hooks.field_hook(name)?.reads() {
            plan.add(table);
        }
    }
    Ok(())
}

fn add_subtree_reads(chain: &XfmrChain, root: NodeId, plan: &mut ReadPlan) -> XlateResult<()> {
    if let Some(name) = &chain.index.node(root).mapping.subtree_hook {
        for table in chain.hooks.subtree_hook(name)?.reads() {
            plan.add(table);
        }
    }
    Ok(())
}
