//! Path Resolver
//!
//! Binds a parsed path to schema nodes and typed key values. The result
//! names the target node, the key values bound on every list along the way,
//! and for `leaf-list[leaf-list=value]` the addressed member.

use serde_json::Value;

use super::parser::{parse_path, PathSegment};
use crate::errors::{XlateError, XlateResult};
use crate::schema::{NodeId, NodeKind, SchemaIndex};

/// Key values of one list instance, in schema key order
#[derive(Debug, Clone, PartialEq)]
pub struct ListKeys {
    pub list: NodeId,
    pub values: Vec<(String, Value)>,
}

/// Key values bound on the lists enclosing a position, outermost first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyScope {
    lists: Vec<ListKeys>,
}

impl KeyScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, list: NodeId, values: Vec<(String, Value)>) {
        self.lists.push(ListKeys { list, values });
    }

    /// Copy of this scope with one more bound list
    pub fn with(&self, list: NodeId, values: Vec<(String, Value)>) -> Self {
        let mut scope = self.clone();
        scope.push(list, values);
        scope
    }

    pub fn lists(&self) -> &[ListKeys] {
        &self.lists
    }

    pub fn for_list(&self, list: NodeId) -> Option<&ListKeys> {
        self.lists.iter().find(|l| l.list == list)
    }

    pub fn is_bound(&self, list: NodeId) -> bool {
        self.for_list(list).is_some()
    }

    /// Value of a key leaf, innermost list first
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.lists
            .iter()
            .rev()
            .find_map(|l| l.values.iter().find(|(k, _)| k == name).map(|(_, v)| v))
    }

    /// Scope restricted to lists that enclose `node`
    pub fn enclosing(&self, index: &SchemaIndex, node: NodeId) -> KeyScope {
        KeyScope {
            lists: self
                .lists
                .iter()
                .filter(|l| index.is_ancestor_or_self(l.list, node))
                .cloned()
                .collect(),
        }
    }
}

/// One resolved path element
#[derive(Debug, Clone, PartialEq)]
pub struct PathElem {
    pub node: NodeId,
    /// Bound key values; empty unless the node is a list with predicates
    pub keys: Vec<(String, Value)>,
}

/// A path bound to the schema
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub text: String,
    pub elems: Vec<PathElem>,
    /// Member addressed by a leaf-list instance predicate
    pub leaf_list_value: Option<Value>,
}

impl ResolvedPath {
    pub fn target(&self) -> NodeId {
        // elems is never empty after resolution
        self.elems[self.elems.len() - 1].node
    }

    pub fn target_elem(&self) -> &PathElem {
        &self.elems[self.elems.len() - 1]
    }

    /// Target is a list with all keys bound
    pub fn is_instance(&self, index: &SchemaIndex) -> bool {
        index.node(self.target()).is_list() && !self.target_elem().keys.is_empty()
    }

    /// Keys bound along the whole path
    pub fn scope(&self) -> KeyScope {
        let mut scope = KeyScope::new();
        for elem in &self.elems {
            if !elem.keys.is_empty() {
                scope.push(elem.node, elem.keys.clone());
            }
        }
        scope
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.elems.iter().any(|e| e.node == node)
    }

    pub fn elem(&self, node: NodeId) -> Option<&PathElem> {
        self.elems.iter().find(|e| e.node == node)
    }
}

/// Resolves path strings against a schema index
pub struct PathResolver<'a> {
    index: &'a SchemaIndex,
}

impl<'a> PathResolver<'a> {
    pub fn new(index: &'a SchemaIndex) -> Self {
        Self { index }
    }

    pub fn resolve(&self, path: &str) -> XlateResult<ResolvedPath> {
        let segments = parse_path(path)?;
        let mut elems: Vec<PathElem> = Vec::with_capacity(segments.len());
        let mut leaf_list_value = None;
        let last = segments.len() - 1;

        for (i, seg) in segments.iter().enumerate() {
            let node = match elems.last() {
                None => self.index.root(&seg.name),
                Some(parent) => self.index.child(parent.node, &seg.name),
            }
            .ok_or_else(|| unknown_element(seg, path))?;

            let schema = self.index.node(node);
            if let Some(module) = &seg.module {
                if *module != schema.module {
                    return Err(unknown_element(seg, path));
                }
            }

            let keys = match schema.kind {
                NodeKind::List => {
                    if seg.predicates.is_empty() && i != last {
                        return Err(XlateError::invalid_args(format!(
                            "List '{}' requires key values before '{}'",
                            seg.name, segments[i + 1].name
                        ))
                        .with_path(path));
                    }
                    self.bind_keys(node, seg, path)?
                }
                NodeKind::LeafList if !seg.predicates.is_empty() => {
                    leaf_list_value = Some(self.bind_member(node, seg, path, i == last)?);
                    Vec::new()
                }
                _ if !seg.predicates.is_empty() => {
                    return Err(XlateError::invalid_args(format!(
                        "'{}' is not a list and takes no key predicates",
                        seg.name
                    ))
                    .with_path(path));
                }
                _ => Vec::new(),
            };

            elems.push(PathElem { node, keys });
        }

        Ok(ResolvedPath {
            text: path.to_string(),
            elems,
            leaf_list_value,
        })
    }

    /// Bind list predicates to typed key values in schema key order
    fn bind_keys(&self, list: NodeId, seg: &PathSegment, path: &str) -> XlateResult<Vec<(String, Value)>> {
        if seg.predicates.is_empty() {
            return Ok(Vec::new());
        }
        let schema = self.index.node(list);

        for (name, _) in &seg.predicates {
            let bare = strip_prefix(name);
            if !schema.is_key(bare) {
                return Err(XlateError::invalid_args(format!(
                    "'{}' is not a key of list '{}'",
                    bare, schema.name
                ))
                .with_path(path));
            }
        }
        if seg.predicates.len() != schema.keys.len() {
            return Err(XlateError::invalid_args(format!(
                "List '{}' requires keys [{}]",
                schema.name,
                schema.keys.join(", ")
            ))
            .with_path(path));
        }

        let mut values = Vec::with_capacity(schema.keys.len());
        for key in &schema.keys {
            let mut matching = seg.predicates.iter().filter(|(n, _)| strip_prefix(n) == key);
            let (_, raw) = matching.next().ok_or_else(|| {
                XlateError::invalid_args(format!("Missing key '{}' for list '{}'", key, schema.name))
                    .with_path(path)
            })?;
            if matching.next().is_some() {
                return Err(XlateError::invalid_args(format!("Key '{}' given twice", key)).with_path(path));
            }

            let key_node = self
                .index
                .child(list, key)
                .ok_or_else(|| XlateError::internal(format!("list '{}' lost key leaf '{}'", schema.name, key)))?;
            let value = self.index.node(key_node).leaf_type()?.parse_text(raw).map_err(|e| {
                XlateError::invalid_args(format!("Invalid value for key '{}': {}", key, e)).with_path(path)
            })?;
            values.push((key.clone(), value));
        }
        Ok(values)
    }

    /// Bind a `leaf-list[leaf-list=value]` predicate
    fn bind_member(&self, node: NodeId, seg: &PathSegment, path: &str, is_last: bool) -> XlateResult<Value> {
        let schema = self.index.node(node);
        let valid = is_last
            && seg.predicates.len() == 1
            && strip_prefix(&seg.predicates[0].0) == schema.name;
        if !valid {
            return Err(XlateError::invalid_args(format!(
                "Leaf-list '{}' accepts only a '[{}=value]' predicate at the end of the path",
                schema.name, schema.name
            ))
            .with_path(path));
        }
        schema
            .leaf_type()?
            .parse_text(&seg.predicates[0].1)
            .map_err(|e| XlateError::invalid_args(format!("Invalid value for '{}': {}", schema.name, e)).with_path(path))
    }
}

fn strip_prefix(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, n)| n)
}

fn unknown_element(seg: &PathSegment, path: &str) -> XlateError {
    let shown = match &seg.module {
        Some(m) => format!("{}:{}", m, seg.name),
        None => seg.name.clone(),
    };
    XlateError::not_found(format!("Unknown path element '{}'", shown)).with_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::errors::XlateErrorCode;
    use crate::schema::{LeafType, SchemaNode};
    use serde_json::json;

    fn index() -> SchemaIndex {
        let root = SchemaNode::container("top")
            .module("example-top")
            .child(
                SchemaNode::list("entry", &["mode", "id"])
                    .table("ENTRY")
                    .child(SchemaNode::leaf("mode", LeafType::enumeration(&["a", "b"])))
                    .child(SchemaNode::leaf("id", LeafType::uint(100)))
                    .child(
                        SchemaNode::container("config")
                            .child(SchemaNode::leaf("descr", LeafType::string()))
                            .child(SchemaNode::leaf_list("tags", LeafType::string())),
                    ),
            );
        SchemaIndex::build(vec![root], &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_resolve_instance_keys_in_schema_order() {
        let idx = index();
        let resolver = PathResolver::new(&idx);
        let path = resolver.resolve("/example-top:top/entry[id=7][mode=a]/config/descr").unwrap();

        assert_eq!(path.elems.len(), 4);
        let scope = path.scope();
        assert_eq!(scope.lists().len(), 1);
        assert_eq!(scope.lists()[0].values, vec![("mode".into(), json!("a")), ("id".into(), json!(7))]);
        assert_eq!(scope.get("id"), Some(&json!(7)));
        assert_eq!(idx.node(path.target()).name, "descr");
    }

    #[test]
    fn test_unknown_element_is_not_found() {
        let idx = index();
        let resolver = PathResolver::new(&idx);
        let err = resolver.resolve("/top/entry[mode=a][id=1]/bogus").unwrap_err();
        assert_eq!(err.code(), XlateErrorCode::NotFound);
        assert!(err.message().contains("bogus"));

        let err = resolver.resolve("/other-module:top").unwrap_err();
        assert_eq!(err.code(), XlateErrorCode::NotFound);
    }

    #[test]
    fn test_key_errors_are_invalid_args() {
        let idx = index();
        let resolver = PathResolver::new(&idx);
        for bad in [
            "/top/entry[mode=a]",
            "/top/entry[mode=a][descr=x]",
            "/top/entry[mode=c][id=1]",
            "/top/entry[mode=a][id=abc]",
            "/top/entry[mode=a][id=101]",
            "/top/entry/config",
            "/top[mode=a]",
        ] {
            let err = resolver.resolve(bad).unwrap_err();
            assert_eq!(err.code(), XlateErrorCode::InvalidArgs, "path {}", bad);
        }
    }

    #[test]
    fn test_keyless_list_target() {
        let idx = index();
        let resolver = PathResolver::new(&idx);
        let path = resolver.resolve("/top/entry").unwrap();
        assert!(!path.is_instance(&idx));
        assert!(path.scope().lists().is_empty());
    }

    #[test]
    fn test_leaf_list_member() {
        let idx = index();
        let resolver = PathResolver::new(&idx);
        let path = resolver.resolve("/top/entry[mode=b][id=2]/config/tags[tags=blue]").unwrap();
        assert_eq!(path.leaf_list_value, Some(json!("blue")));

        let err = resolver.resolve("/top/entry[mode=b][id=2]/config/tags[other=blue]").unwrap_err();
        assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
    }
}
