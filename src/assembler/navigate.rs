//! Moving between wire-form trees and the request target

use serde_json::{Map, Value};

use crate::errors::XlateResult;
use crate::path::ResolvedPath;
use crate::schema::{NodeId, SchemaIndex};

fn bare(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, n)| n)
}

/// Member of a wire-form object by unqualified name
pub fn member<'v>(obj: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
    obj.iter().find(|(k, _)| bare(k) == name).map(|(_, v)| v)
}

/// From the content of `root` (a node on the path), walk down to the
/// request target. `None` when any step has no data.
pub fn descend(index: &SchemaIndex, path: &ResolvedPath, root: NodeId, content: Value) -> XlateResult<Option<Value>> {
    let Some(start) = path.elems.iter().position(|e| e.node == root) else {
        return Ok(None);
    };

    let mut value = content;
    for (i, elem) in path.elems.iter().enumerate().skip(start) {
        let node = index.node(elem.node);
        if i > start {
            let Some(next) = value.as_object().and_then(|o| member(o, &node.name)).cloned() else {
                return Ok(None);
            };
            value = next;
        }

        if node.is_list() && !elem.keys.is_empty() {
            let Some(entries) = value.as_array() else {
                return Ok(None);
            };
            let mut found = None;
            for entry in entries {
                if entry_matches(index, elem.node, entry, &elem.keys)? {
                    found = Some(entry.clone());
                    break;
                }
            }
            match found {
                Some(entry) => value = entry,
                None => return Ok(None),
            }
        }
    }
    Ok(Some(value))
}

fn entry_matches(index: &SchemaIndex, list: NodeId, entry: &Value, keys: &[(String, Value)]) -> XlateResult<bool> {
    let Some(obj) = entry.as_object() else {
        return Ok(false);
    };
    for (key, wanted) in keys {
        let Some(leaf) = index.child(list, key) else {
            return Ok(false);
        };
        let matches = member(obj, key)
            .and_then(|v| index.node(leaf).leaf_type().ok()?.check(v).ok())
            .map_or(false, |v| v == *wanted);
        if !matches {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Response body: `{"module:target": content}`, list instances as a
/// one-entry array, `{}` when there is no data
pub fn wrap(index: &SchemaIndex, path: &ResolvedPath, content: Option<Value>) -> Value {
    let Some(content) = content else {
        return Value::Object(Map::new());
    };
    let target = index.node(path.target());
    let content = match content {
        Value::Array(_) => content,
        other if path.is_instance(index) => Value::Array(vec![other]),
        other => other,
    };
    let mut out = Map::new();
    out.insert(format!("{}:{}", target.module, target.name), content);
    Value::Object(out)
}
