//! Query Filter
//!
//! Post-processes the assembled content of the request target, in order:
//! 1. `content`: keep config or state nodes
//! 2. `depth`: drop nodes more than N levels below the target (target is
//!    level 1; a list and its entries share a level, key leaves included)
//! 3. `fields`: project named relative paths, keeping list keys
//!
//! Containers and list entries emptied by filtering disappear. A target
//! left with nothing is reported as no content.

use serde_json::{Map, Value};

use super::params::{ContentKind, QueryParameters};
use crate::errors::{XlateError, XlateResult};
use crate::schema::{NodeId, SchemaIndex};

/// Applies query parameters to assembled content
pub struct QueryFilter<'a> {
    index: &'a SchemaIndex,
    target: NodeId,
}

impl<'a> QueryFilter<'a> {
    pub fn new(index: &'a SchemaIndex, target: NodeId) -> Self {
        Self { index, target }
    }

    /// Reject parameters the target cannot honor. Runs before any read.
    pub fn check(&self, params: &QueryParameters) -> XlateResult<Vec<Vec<NodeId>>> {
        let node = self.index.node(self.target);
        let mismatch = match params.content {
            ContentKind::All => false,
            ContentKind::Config => !node.has_config,
            ContentKind::NonConfig | ContentKind::Operational => !node.has_state,
        };
        if mismatch {
            return Err(XlateError::invalid_args("Query Parameter Content mismatch"));
        }

        if params.fields.is_empty() {
            return Ok(Vec::new());
        }
        if node.kind.is_terminal() {
            return Err(XlateError::invalid_args(
                "Bad Request - fields query parameter specified on a terminal node uri.",
            ));
        }
        params.fields.iter().map(|f| self.resolve_field(f)).collect()
    }

    fn resolve_field(&self, field: &str) -> XlateResult<Vec<NodeId>> {
        let invalid = || XlateError::invalid_args(format!("Invalid field name/path: {}", field));
        let mut chain = Vec::new();
        let mut current = self.target;
        for seg in field.split('/').filter(|s| !s.is_empty()) {
            let name = seg.split('[').next().unwrap_or(seg);
            let (module, bare) = match name.split_once(':') {
                Some((m, n)) => (Some(m), n),
                None => (None, name),
            };
            let child = self.index.child(current, bare).ok_or_else(invalid)?;
            if module.map_or(false, |m| m != self.index.node(child).module) {
                return Err(invalid());
            }
            chain.push(child);
            current = child;
        }
        if chain.is_empty() {
            return Err(invalid());
        }
        Ok(chain)
    }

    /// Apply every filter; `None` in, `None` out
    pub fn apply(&self, params: &QueryParameters, content: Option<Value>) -> XlateResult<Option<Value>> {
        let selections = self.check(params)?;
        let Some(mut value) = content else {
            return Ok(None);
        };
        if self.index.node(self.target).kind.is_terminal() {
            return Ok(Some(value));
        }

        if params.content != ContentKind::All {
            self.filter_content(self.target, &mut value, params.content);
        }
        if params.depth > 0 {
            self.prune_depth(self.target, &mut value, 1, params.depth);
        }
        if !selections.is_empty() {
            let refs: Vec<&[NodeId]> = selections.iter().map(Vec::as_slice).collect();
            self.project(self.target, &mut value, &refs);
        }
        if is_empty(&value) {
            return Ok(None);
        }
        Ok(Some(value))
    }

    fn child_of(&self, parent: NodeId, member: &str) -> Option<NodeId> {
        let bare = member.rsplit_once(':').map_or(member, |(_, n)| n);
        self.index.child(parent, bare)
    }

    fn is_list_key(&self, parent: NodeId, child: NodeId) -> bool {
        let p = self.index.node(parent);
        p.is_list() && p.is_key(&self.index.node(child).name)
    }

    /// Object members of `id`'s value: the object itself, or every entry
    /// of a list
    fn for_each_object(&self, id: NodeId, value: &mut Value, f: &mut dyn FnMut(&mut Map<String, Value>)) {
        match value {
            Value::Object(obj) => f(obj),
            Value::Array(entries) if self.index.node(id).is_list() => {
                for entry in entries {
                    if let Value::Object(obj) = entry {
                        f(obj);
                    }
                }
            }
            _ => {}
        }
    }

    fn keeps_terminal(&self, id: NodeId, kind: ContentKind) -> bool {
        let node = self.index.node(id);
        match kind {
            ContentKind::All => true,
            ContentKind::Config => !node.is_state(),
            ContentKind::NonConfig => node.is_state(),
            ContentKind::Operational => node.is_state() && !node.has_config_counterpart,
        }
    }

    fn filter_content(&self, id: NodeId, value: &mut Value, kind: ContentKind) {
        self.for_each_object(id, value, &mut |obj| {
            let names: Vec<String> = obj.keys().cloned().collect();
            for name in names {
                let Some(child) = self.child_of(id, &name) else {
                    continue;
                };
                if self.is_list_key(id, child) {
                    continue;
                }
                let keep = if self.index.node(child).kind.is_terminal() {
                    self.keeps_terminal(child, kind)
                } else {
                    match obj.get_mut(&name) {
                        Some(v) => {
                            self.filter_content(child, v, kind);
                            !is_empty(v)
                        }
                        None => false,
                    }
                };
                if !keep {
                    obj.remove(&name);
                }
            }
        });
    }

    fn prune_depth(&self, id: NodeId, value: &mut Value, level: u32, max: u32) {
        self.for_each_object(id, value, &mut |obj| {
            let names: Vec<String> = obj.keys().cloned().collect();
            for name in names {
                let Some(child) = self.child_of(id, &name) else {
                    continue;
                };
                let keep = level < max
                    && match obj.get_mut(&name) {
                        Some(v) if !self.index.node(child).kind.is_terminal() => {
                            self.prune_depth(child, v, level + 1, max);
                            !is_empty(v)
                        }
                        Some(_) => true,
                        None => false,
                    };
                if !keep {
                    obj.remove(&name);
                }
            }
        });
        if let Value::Array(entries) = value {
            entries.retain(|entry| !is_empty(entry));
        }
    }

    fn project(&self, id: NodeId, value: &mut Value, selections: &[&[NodeId]]) {
        if selections.iter().any(|s| s.is_empty()) {
            return;
        }
        self.for_each_object(id, value, &mut |obj| {
            let names: Vec<String> = obj.keys().cloned().collect();
            for name in names {
                let Some(child) = self.child_of(id, &name) else {
                    obj.remove(&name);
                    continue;
                };
                if self.is_list_key(id, child) {
                    continue;
                }
                let rest: Vec<&[NodeId]> = selections
                    .iter()
                    .filter(|s| s.first() == Some(&child))
                    .map(|s| &s[1..])
                    .collect();
                if rest.is_empty() {
                    obj.remove(&name);
                    continue;
                }
                if let Some(v) = obj.get_mut(&name) {
                    self.project(child, v, &rest);
                    if is_empty(v) {
                        obj.remove(&name);
                    }
                }
            }
        });
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Object(o) => o.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::errors::XlateErrorCode;
    use crate::schema::{LeafType, SchemaNode};
    use serde_json::json;

    fn index() -> SchemaIndex {
        let root = SchemaNode::container("interfaces").module("openconfig-interfaces").child(
            SchemaNode::list("interface", &["name"])
                .table("PORT")
                .child(SchemaNode::leaf("name", LeafType::string()))
                .child(
                    SchemaNode::container("config")
                        .child(SchemaNode::leaf("mtu", LeafType::uint(9216)))
                        .child(SchemaNode::leaf("description", LeafType::string())),
                )
                .child(
                    SchemaNode::container("state")
                        .state()
                        .child(SchemaNode::leaf("mtu", LeafType::uint(9216)))
                        .child(SchemaNode::leaf("oper-status", LeafType::string())),
                ),
        );
        SchemaIndex::build(vec![root], &EngineConfig::default()).unwrap()
    }

    fn sample() -> Value {
        json!([{
            "name": "Ethernet0",
            "config": {"mtu": 9100, "description": "uplink"},
            "state": {"mtu": 9100, "oper-status": "UP"}
        }])
    }

    fn run(params: QueryParameters) -> XlateResult<Option<Value>> {
        let idx = index();
        let list = idx.lookup("/interfaces/interface").unwrap();
        QueryFilter::new(&idx, list).apply(&params, Some(sample()))
    }

    #[test]
    fn test_content_config() {
        let out = run(QueryParameters::new().with_content(ContentKind::Config)).unwrap();
        assert_eq!(out, Some(json!([{"name": "Ethernet0", "config": {"mtu": 9100, "description": "uplink"}}])));
    }

    #[test]
    fn test_content_operational_drops_mirrored_state() {
        let out = run(QueryParameters::new().with_content(ContentKind::Operational)).unwrap();
        assert_eq!(out, Some(json!([{"name": "Ethernet0", "state": {"oper-status": "UP"}}])));
    }

    #[test]
    fn test_content_mismatch() {
        let idx = index();
        let config = idx.lookup("/interfaces/interface/config").unwrap();
        let err = QueryFilter::new(&idx, config)
            .check(&QueryParameters::new().with_content(ContentKind::NonConfig))
            .unwrap_err();
        assert_eq!(err.message(), "Query Parameter Content mismatch");
    }

    #[test]
    fn test_depth_counts_entries_with_their_list() {
        let out = run(QueryParameters::new().with_depth(1)).unwrap();
        assert_eq!(out, None);

        let out = run(QueryParameters::new().with_depth(2)).unwrap();
        assert_eq!(out, Some(json!([{"name": "Ethernet0"}])));

        let out = run(QueryParameters::new().with_depth(3)).unwrap();
        assert_eq!(out, Some(sample()));
    }

    #[test]
    fn test_depth_below_container() {
        let idx = index();
        let root = idx.lookup("/interfaces").unwrap();
        let filter = QueryFilter::new(&idx, root);
        let content = || Some(json!({"interface": sample()}));

        let out = filter.apply(&QueryParameters::new().with_depth(2), content()).unwrap();
        assert_eq!(out, None);

        let out = filter.apply(&QueryParameters::new().with_depth(3), content()).unwrap();
        assert_eq!(out, Some(json!({"interface": [{"name": "Ethernet0"}]})));
    }

    #[test]
    fn test_fields_projection() {
        let out = run(QueryParameters::new().with_fields(["config/mtu", "state/oper-status"])).unwrap();
        assert_eq!(
            out,
            Some(json!([{"name": "Ethernet0", "config": {"mtu": 9100}, "state": {"oper-status": "UP"}}]))
        );
    }

    #[test]
    fn test_fields_errors() {
        let idx = index();
        let leaf = idx.lookup("/interfaces/interface/config/mtu").unwrap();
        let err = QueryFilter::new(&idx, leaf)
            .check(&QueryParameters::new().with_fields(["x"]))
            .unwrap_err();
        assert_eq!(err.message(), "Bad Request - fields query parameter specified on a terminal node uri.");

        let err = run(QueryParameters::new().with_fields(["config/bogus"])).unwrap_err();
        assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    }
}
