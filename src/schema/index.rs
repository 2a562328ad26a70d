//! Schema Index
//!
//! Flattens the schema tree into an arena addressed by [`NodeId`]. Each
//! indexed node carries its resolved (inherited) mapping so the resolver,
//! planner and assembler never walk ancestors to find a table or database.
//!
//! The index is immutable after build and shared behind an `Arc`.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::types::{Classification, LeafType, NodeKind, NodeMapping, SchemaNode};
use crate::config::EngineConfig;
use crate::errors::{XlateError, XlateResult};

/// Position of a node in the arena
pub type NodeId = usize;

/// A schema node with resolved mapping
#[derive(Debug, Clone)]
pub struct IndexedNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub name: String,
    pub module: String,
    pub kind: NodeKind,
    pub keys: Vec<String>,
    pub classification: Classification,
    pub leaf_type: Option<LeafType>,
    pub default: Option<Value>,
    /// Annotations as declared on this node
    pub mapping: NodeMapping,
    pub children: Vec<NodeId>,
    /// Module-qualified path (`/openconfig-interfaces:interfaces/interface`)
    pub xpath: String,
    /// Root is depth 1
    pub depth: usize,
    pub db: String,
    /// Nearest static table
    pub table: Option<String>,
    /// Nearest table hook, when no closer static table exists
    pub table_hook: Option<String>,
    /// Nearest static row key below the last list boundary
    pub row_key: Option<String>,
    /// Store field of a leaf or leaf-list
    pub field: Option<String>,
    /// Nearest ancestor-or-self carrying a subtree hook
    pub subtree_root: Option<NodeId>,
    /// Get can produce data for this node
    pub retrievable: bool,
    /// State leaf mirrored by a leaf of the sibling `config` container
    pub has_config_counterpart: bool,
    /// Subtree contains state nodes
    pub has_state: bool,
    /// Subtree contains config nodes
    pub has_config: bool,
}

impl IndexedNode {
    pub fn is_list(&self) -> bool {
        self.kind == NodeKind::List
    }

    pub fn is_state(&self) -> bool {
        self.classification == Classification::State
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.keys.iter().any(|k| k == name)
    }

    /// Type of a terminal node
    pub fn leaf_type(&self) -> XlateResult<&LeafType> {
        self.leaf_type
            .as_ref()
            .ok_or_else(|| XlateError::internal(format!("{} has no type", self.xpath)))
    }
}

/// Immutable arena of indexed schema nodes
#[derive(Debug, Clone)]
pub struct SchemaIndex {
    nodes: Vec<IndexedNode>,
    roots: Vec<NodeId>,
}

struct Inherited {
    parent: Option<NodeId>,
    module: String,
    classification: Classification,
    db: String,
    table: Option<String>,
    table_hook: Option<String>,
    row_key: Option<String>,
    subtree_root: Option<NodeId>,
    xpath: String,
    depth: usize,
}

impl SchemaIndex {
    /// Index a set of root nodes
    pub fn build(roots: Vec<SchemaNode>, config: &EngineConfig) -> XlateResult<Self> {
        let mut index = SchemaIndex {
            nodes: Vec::new(),
            roots: Vec::new(),
        };

        let mut seen = HashSet::new();
        for root in &roots {
            if !seen.insert(root.name.clone()) {
                return Err(schema_error(format!("duplicate root '{}'", root.name)));
            }
            let module = root
                .module
                .clone()
                .ok_or_else(|| schema_error(format!("root '{}' has no module", root.name)))?;
            let inherited = Inherited {
                parent: None,
                module,
                classification: Classification::Config,
                db: config.default_db.clone(),
                table: None,
                table_hook: None,
                row_key: None,
                subtree_root: None,
                xpath: String::new(),
                depth: 1,
            };
            let id = index.insert(root, inherited, config)?;
            index.roots.push(id);
        }

        index.resolve_flags();
        Ok(index)
    }

    fn insert(&mut self, node: &SchemaNode, inh: Inherited, config: &EngineConfig) -> XlateResult<NodeId> {
        let id = self.nodes.len();
        let module = node.module.clone().unwrap_or_else(|| inh.module.clone());
        let qualified = if inh.parent.is_none() || module != inh.module {
            format!("{}:{}", module, node.name)
        } else {
            node.name.clone()
        };
        let xpath = format!("{}/{}", inh.xpath, qualified);

        let db = node.mapping.db.clone().unwrap_or(inh.db);
        config.db(&db).map_err(|_| schema_error(format!("{} names unknown database '{}'", xpath, db)))?;

        let (table, table_hook) = if node.mapping.table.is_some() {
            (node.mapping.table.clone(), None)
        } else if node.mapping.table_hook.is_some() {
            (None, node.mapping.table_hook.clone())
        } else {
            (inh.table, inh.table_hook)
        };

        let row_key = if node.mapping.key.is_some() {
            node.mapping.key.clone()
        } else if node.kind == NodeKind::List {
            None
        } else {
            inh.row_key
        };

        let subtree_root = if node.mapping.subtree_hook.is_some() {
            Some(id)
        } else {
            inh.subtree_root
        };

        let field = match node.kind {
            NodeKind::Leaf => Some(node.mapping.field.clone().unwrap_or_else(|| node.name.clone())),
            NodeKind::LeafList => {
                let base = node.mapping.field.clone().unwrap_or_else(|| node.name.clone());
                if base.ends_with(&config.leaf_list_suffix) {
                    Some(base)
                } else {
                    Some(format!("{}{}", base, config.leaf_list_suffix))
                }
            }
            _ => None,
        };

        let classification = node.classification.unwrap_or(inh.classification);

        self.validate_node(node, &xpath)?;

        self.nodes.push(IndexedNode {
            id,
            parent: inh.parent,
            name: node.name.clone(),
            module: module.clone(),
            kind: node.kind,
            keys: node.keys.clone(),
            classification,
            leaf_type: node.leaf_type.clone(),
            default: node.default.clone(),
            mapping: node.mapping.clone(),
            children: Vec::new(),
            xpath: xpath.clone(),
            depth: inh.depth,
            db: db.clone(),
            table: table.clone(),
            table_hook: table_hook.clone(),
            row_key: row_key.clone(),
            field,
            subtree_root,
            retrievable: false,
            has_config_counterpart: false,
            has_state: false,
            has_config: false,
        });

        for child in &node.children {
            let child_inh = Inherited {
                parent: Some(id),
                module: module.clone(),
                classification,
                db: db.clone(),
                table: table.clone(),
                table_hook: table_hook.clone(),
                row_key: row_key.clone(),
                subtree_root,
                xpath: xpath.clone(),
                depth: inh.depth + 1,
            };
            let child_id = self.insert(child, child_inh, config)?;
            self.nodes[id].children.push(child_id);
        }

        Ok(id)
    }

    fn validate_node(&self, node: &SchemaNode, xpath: &str) -> XlateResult<()> {
        let mut names = HashSet::new();
        for child in &node.children {
            if !names.insert(child.name.as_str()) {
                return Err(schema_error(format!("{} has duplicate child '{}'", xpath, child.name)));
            }
        }

        match node.kind {
            NodeKind::List => {
                if node.keys.is_empty() {
                    return Err(schema_error(format!("list {} has no keys", xpath)));
                }
                for key in &node.keys {
                    let declared = node
                        .children
                        .iter()
                        .any(|c| c.name == *key && c.kind == NodeKind::Leaf);
                    if !declared {
                        return Err(schema_error(format!("list {} key '{}' is not a child leaf", xpath, key)));
                    }
                }
            }
            NodeKind::Leaf | NodeKind::LeafList => {
                let ty = node
                    .leaf_type
                    .as_ref()
                    .ok_or_else(|| schema_error(format!("{} has no type", xpath)))?;
                ty.compiled_pattern().map_err(|e| schema_error(format!("{}: {}", xpath, e)))?;
                if let Some(default) = &node.default {
                    ty.check(default)
                        .map_err(|e| schema_error(format!("{} default: {}", xpath, e)))?;
                }
                if !node.children.is_empty() {
                    return Err(schema_error(format!("{} is terminal but has children", xpath)));
                }
            }
            NodeKind::Container => {}
        }
        Ok(())
    }

    /// Compute retrievability, counterparts and classification summaries bottom-up
    fn resolve_flags(&mut self) {
        // children always have larger ids than their parent
        for id in (0..self.nodes.len()).rev() {
            let node = &self.nodes[id];
            let (retrievable, has_state, has_config) = match node.kind {
                NodeKind::Leaf | NodeKind::LeafList => {
                    let is_key = node
                        .parent
                        .map_or(false, |p| self.nodes[p].is_list() && self.nodes[p].is_key(&node.name));
                    let mapped = node.subtree_root.is_some()
                        || is_key
                        || node.mapping.from_key.is_some()
                        || node.mapping.field_hook.is_some()
                        || (node.table.is_some() || node.table_hook.is_some())
                            && (!node.is_state()
                                || node.mapping.field.is_some()
                                || node.mapping.codec.is_some());
                    (mapped, node.is_state(), !node.is_state())
                }
                _ => {
                    let mut flags = (node.subtree_root.is_some(), false, false);
                    for c in &node.children {
                        let child = &self.nodes[*c];
                        flags.0 |= child.retrievable;
                        flags.1 |= child.has_state;
                        flags.2 |= child.has_config;
                    }
                    flags
                }
            };

            let counterpart = self.config_counterpart(id).is_some();
            let node = &mut self.nodes[id];
            node.retrievable = retrievable;
            node.has_state = has_state;
            node.has_config = has_config;
            node.has_config_counterpart = counterpart;
        }
    }

    /// For a state leaf under `state`, the same-named leaf under sibling `config`
    pub fn config_counterpart(&self, id: NodeId) -> Option<NodeId> {
        let node = &self.nodes[id];
        if !node.kind.is_terminal() || !node.is_state() {
            return None;
        }
        let parent = &self.nodes[node.parent?];
        if parent.name != "state" {
            return None;
        }
        let config = self.child(parent.parent?, "config")?;
        let mirror = self.child(config, &node.name)?;
        (!self.nodes[mirror].is_state()).then_some(mirror)
    }

    pub fn node(&self, id: NodeId) -> &IndexedNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn root(&self, name: &str) -> Option<NodeId> {
        self.roots.iter().copied().find(|id| self.nodes[*id].name == name)
    }

    /// Child by unqualified name
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[*id].name == name)
    }

    /// Look up a node by unqualified slash path (`/interfaces/interface/config`)
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.trim_start_matches('/').split('/');
        let mut current = self.root(segments.next()?)?;
        for seg in segments {
            current = self.child(current, seg)?;
        }
        Some(current)
    }

    /// Name as emitted on the wire: module-qualified at module boundaries
    pub fn qualified_name(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        match node.parent {
            Some(p) if self.nodes[p].module == node.module => node.name.clone(),
            _ => format!("{}:{}", node.module, node.name),
        }
    }

    /// Ancestors root-first, including the node itself
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let mut current = self.nodes[id].parent;
        while let Some(p) = current {
            out.push(p);
            current = self.nodes[p].parent;
        }
        out.reverse();
        out
    }

    /// List ancestors root-first, including the node itself when it is a list
    pub fn list_lineage(&self, id: NodeId) -> Vec<NodeId> {
        self.lineage(id)
            .into_iter()
            .filter(|n| self.nodes[*n].is_list())
            .collect()
    }

    /// Nearest list ancestor-or-self
    pub fn key_owner(&self, id: NodeId) -> Option<NodeId> {
        self.list_lineage(id).last().copied()
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.nodes[c].parent;
        }
        false
    }

    /// Pre-order descendants, excluding the node itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev().copied());
        }
        out
    }

    /// Every (node, hook kind, hook name) reference, for registry checks
    pub fn hook_refs(&self) -> Vec<(NodeId, &'static str, &str)> {
        let mut refs = Vec::new();
        for node in &self.nodes {
            let m = &node.mapping;
            let named = [
                ("table", &m.table_hook),
                ("key", &m.key_hook),
                ("field", &m.field_hook),
                ("subtree", &m.subtree_hook),
                ("pre", &m.pre_hook),
                ("post", &m.post_hook),
                ("codec", &m.codec),
            ];
            for (kind, name) in named {
                if let Some(name) = name {
                    refs.push((node.id, kind, name.as_str()));
                }
            }
        }
        refs
    }

    /// Group children by name for quick payload lookups
    pub fn children_by_name(&self, id: NodeId) -> HashMap<&str, NodeId> {
        self.nodes[id]
            .children
            .iter()
            .map(|c| (self.nodes[*c].name.as_str(), *c))
            .collect()
    }
}

fn schema_error(message: String) -> XlateError {
    XlateError::internal(format!("Schema error: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::XlateErrorCode;
    use serde_json::json;

    fn sample() -> Vec<SchemaNode> {
        vec![SchemaNode::container("interfaces")
            .module("openconfig-interfaces")
            .child(
                SchemaNode::list("interface", &["name"])
                    .table("PORT")
                    .child(SchemaNode::leaf("name", LeafType::string()))
                    .child(
                        SchemaNode::container("config")
                            .child(SchemaNode::leaf("name", LeafType::string()).from_key("name"))
                            .child(SchemaNode::leaf("mtu", LeafType::uint(9216)))
                            .child(
                                SchemaNode::leaf("enabled", LeafType::Boolean)
                                    .field("admin_status")
                                    .default_value(json!(true)),
                            ),
                    )
                    .child(
                        SchemaNode::container("state")
                            .state()
                            .child(SchemaNode::leaf("mtu", LeafType::uint(9216)).field("mtu"))
                            .child(SchemaNode::leaf("in-octets", LeafType::Uint { max: None }))
                            .child(
                                SchemaNode::leaf_list("members", LeafType::string())
                                    .module("openconfig-vlan"),
                            ),
                    ),
            )]
    }

    fn index() -> SchemaIndex {
        SchemaIndex::build(sample(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_lookup_and_inheritance() {
        let idx = index();
        let mtu = idx.lookup("/interfaces/interface/config/mtu").unwrap();
        let node = idx.node(mtu);
        assert_eq!(node.table.as_deref(), Some("PORT"));
        assert_eq!(node.db, "CONFIG_DB");
        assert_eq!(node.field.as_deref(), Some("mtu"));
        assert_eq!(node.depth, 4);
        assert_eq!(node.xpath, "/openconfig-interfaces:interfaces/interface/config/mtu");
    }

    #[test]
    fn test_classification_inherits() {
        let idx = index();
        assert!(idx.node(idx.lookup("/interfaces/interface/state/mtu").unwrap()).is_state());
        assert!(!idx.node(idx.lookup("/interfaces/interface/config/mtu").unwrap()).is_state());
    }

    #[test]
    fn test_retrievable_requires_state_mapping() {
        let idx = index();
        assert!(idx.node(idx.lookup("/interfaces/interface/state/mtu").unwrap()).retrievable);
        assert!(!idx.node(idx.lookup("/interfaces/interface/state/in-octets").unwrap()).retrievable);
    }

    #[test]
    fn test_config_counterpart() {
        let idx = index();
        let state_mtu = idx.lookup("/interfaces/interface/state/mtu").unwrap();
        assert!(idx.node(state_mtu).has_config_counterpart);
        let octets = idx.lookup("/interfaces/interface/state/in-octets").unwrap();
        assert!(!idx.node(octets).has_config_counterpart);
    }

    #[test]
    fn test_leaf_list_field_suffix_and_module_boundary() {
        let idx = index();
        let members = idx.lookup("/interfaces/interface/state/members").unwrap();
        assert_eq!(idx.node(members).field.as_deref(), Some("members@"));
        assert_eq!(idx.qualified_name(members), "openconfig-vlan:members");
        assert_eq!(idx.qualified_name(idx.roots()[0]), "openconfig-interfaces:interfaces");
    }

    #[test]
    fn test_list_without_key_leaf_rejected() {
        let bad = vec![SchemaNode::container("top")
            .module("m")
            .child(SchemaNode::list("entry", &["id"]).child(SchemaNode::leaf("other", LeafType::string())))];
        let err = SchemaIndex::build(bad, &EngineConfig::default()).unwrap_err();
        assert_eq!(err.code(), XlateErrorCode::Internal);
        assert!(err.message().contains("key 'id'"));
    }

    #[test]
    fn test_unknown_database_rejected() {
        let bad = vec![SchemaNode::container("top").module("m").db("NOPE_DB")];
        assert!(SchemaIndex::build(bad, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_invalid_default_rejected() {
        let bad = vec![SchemaNode::container("top")
            .module("m")
            .child(SchemaNode::leaf("mtu", LeafType::uint(100)).default_value(json!(500)))];
        assert!(SchemaIndex::build(bad, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_lineage_helpers() {
        let idx = index();
        let mtu = idx.lookup("/interfaces/interface/config/mtu").unwrap();
        let list = idx.lookup("/interfaces/interface").unwrap();
        assert_eq!(idx.lineage(mtu).len(), 4);
        assert_eq!(idx.key_owner(mtu), Some(list));
        assert!(idx.is_ancestor_or_self(list, mtu));
        assert_eq!(idx.descendants(list).len(), 9);
    }
}
