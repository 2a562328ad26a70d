//! Schema node definitions
//!
//! A schema is a tree of containers, keyed lists, leaves and leaf-lists as
//! produced by the external YANG compiler. Each node may carry mapping
//! annotations naming its database, table, row key, field, codec and hooks.
//! Unset annotations are inherited from the nearest ancestor that sets them.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structural kind of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Container,
    List,
    Leaf,
    LeafList,
}

impl NodeKind {
    /// Leaves and leaf-lists carry values
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Leaf | NodeKind::LeafList)
    }
}

/// Configuration vs operational data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Config,
    State,
}

/// Value type of a leaf or leaf-list
///
/// Values handled by the engine are kept in a canonical JSON form:
/// identities without module prefix, numbers as numbers, booleans as
/// booleans. `render` produces the wire form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LeafType {
    String {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
    },
    Boolean,
    Int {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Uint {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<u64>,
    },
    Enumeration {
        values: Vec<String>,
    },
    Identityref {
        module: String,
        values: Vec<String>,
    },
    Union {
        members: Vec<LeafType>,
    },
}

impl LeafType {
    pub fn string() -> Self {
        LeafType::String { pattern: None }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        LeafType::String {
            pattern: Some(pattern.into()),
        }
    }

    pub fn uint(max: u64) -> Self {
        LeafType::Uint { max: Some(max) }
    }

    pub fn int(min: i64, max: i64) -> Self {
        LeafType::Int {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn enumeration(values: &[&str]) -> Self {
        LeafType::Enumeration {
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn identityref(module: impl Into<String>, values: &[&str]) -> Self {
        LeafType::Identityref {
            module: module.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    /// Compiled anchored pattern, if any
    pub fn compiled_pattern(&self) -> Result<Option<Regex>, String> {
        match self {
            LeafType::String { pattern: Some(p) } => Regex::new(&format!("^(?:{})$", p))
                .map(Some)
                .map_err(|e| format!("invalid pattern '{}': {}", p, e)),
            _ => Ok(None),
        }
    }

    /// Validate a payload value and return its canonical form
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        match self {
            LeafType::String { .. } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("expected string, got {}", value))?;
                if let Some(re) = self.compiled_pattern()? {
                    if !re.is_match(s) {
                        return Err(format!("'{}' does not match the required pattern", s));
                    }
                }
                Ok(Value::String(s.to_string()))
            }
            LeafType::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(*b)),
                Value::String(s) if s == "true" => Ok(Value::Bool(true)),
                Value::String(s) if s == "false" => Ok(Value::Bool(false)),
                other => Err(format!("expected boolean, got {}", other)),
            },
            LeafType::Int { min, max } => {
                let n = match value {
                    Value::Number(n) => n.as_i64(),
                    Value::String(s) => s.parse::<i64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| format!("expected integer, got {}", value))?;
                if min.map_or(false, |m| n < m) || max.map_or(false, |m| n > m) {
                    return Err(format!("{} is out of range", n));
                }
                Ok(Value::from(n))
            }
            LeafType::Uint { max } => {
                let n = match value {
                    Value::Number(n) => n.as_u64(),
                    Value::String(s) => s.parse::<u64>().ok(),
                    _ => None,
                }
                .ok_or_else(|| format!("expected unsigned integer, got {}", value))?;
                if max.map_or(false, |m| n > m) {
                    return Err(format!("{} is out of range", n));
                }
                Ok(Value::from(n))
            }
            LeafType::Enumeration { values } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("expected enumeration, got {}", value))?;
                if values.iter().any(|v| v == s) {
                    Ok(Value::String(s.to_string()))
                } else {
                    Err(format!("'{}' is not a valid enumeration value", s))
                }
            }
            LeafType::Identityref { values, .. } => {
                let s = value
                    .as_str()
                    .ok_or_else(|| format!("expected identity, got {}", value))?;
                let bare = s.rsplit_once(':').map_or(s, |(_, v)| v);
                if values.iter().any(|v| v == bare) {
                    Ok(Value::String(bare.to_string()))
                } else {
                    Err(format!("'{}' is not a valid identity", s))
                }
            }
            LeafType::Union { members } => members
                .iter()
                .find_map(|m| m.check(value).ok())
                .ok_or_else(|| format!("{} matches no member of the union", value)),
        }
    }

    /// Parse text from a path predicate or the store into canonical form
    pub fn parse_text(&self, text: &str) -> Result<Value, String> {
        match self {
            LeafType::Boolean | LeafType::Int { .. } | LeafType::Uint { .. } => {
                self.check(&Value::String(text.to_string()))
            }
            LeafType::Union { members } => members
                .iter()
                .find_map(|m| m.parse_text(text).ok())
                .ok_or_else(|| format!("'{}' matches no member of the union", text)),
            _ => self.check(&Value::String(text.to_string())),
        }
    }

    /// Default encoding of a canonical value for the store
    pub fn to_db_text(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => other.to_string(),
        }
    }

    /// Wire form of a canonical value
    pub fn render(&self, value: &Value) -> Value {
        match self {
            LeafType::Identityref { module, values } => match value.as_str() {
                Some(s) if values.iter().any(|v| v == s) => Value::String(format!("{}:{}", module, s)),
                _ => value.clone(),
            },
            LeafType::Union { members } => members
                .iter()
                .find(|m| m.check(value).is_ok())
                .map_or_else(|| value.clone(), |m| m.render(value)),
            _ => value.clone(),
        }
    }
}

/// Mapping annotations of a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMapping {
    /// Database name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<String>,
    /// Static table name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Static row key (e.g. `global`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Field name; defaults to the node name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Named value codec
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    /// Leaf mirrors this ancestor list key and is never stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtree_hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_hook: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_hook: Option<String>,
    /// Create fails with AlreadyExists when the entry is present
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub create_exclusive: bool,
}

/// One node of the schema tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    pub name: String,
    /// Owning module; inherited when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub kind: NodeKind,
    /// List key leaf names, in key order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<String>,
    /// Inherited when absent; roots default to config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub leaf_type: Option<LeafType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub mapping: NodeMapping,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SchemaNode>,
}

impl SchemaNode {
    fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            module: None,
            kind,
            keys: Vec::new(),
            classification: None,
            leaf_type: None,
            default: None,
            mapping: NodeMapping::default(),
            children: Vec::new(),
        }
    }

    pub fn container(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Container)
    }

    pub fn list(name: impl Into<String>, keys: &[&str]) -> Self {
        let mut node = Self::new(name, NodeKind::List);
        node.keys = keys.iter().map(|k| k.to_string()).collect();
        node
    }

    pub fn leaf(name: impl Into<String>, leaf_type: LeafType) -> Self {
        let mut node = Self::new(name, NodeKind::Leaf);
        node.leaf_type = Some(leaf_type);
        node
    }

    pub fn leaf_list(name: impl Into<String>, leaf_type: LeafType) -> Self {
        let mut node = Self::new(name, NodeKind::LeafList);
        node.leaf_type = Some(leaf_type);
        node
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn state(mut self) -> Self {
        self.classification = Some(Classification::State);
        self
    }

    pub fn config(mut self) -> Self {
        self.classification = Some(Classification::Config);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn db(mut self, db: impl Into<String>) -> Self {
        self.mapping.db = Some(db.into());
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.mapping.table = Some(table.into());
        self
    }

    pub fn row_key(mut self, key: impl Into<String>) -> Self {
        self.mapping.key = Some(key.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.mapping.field = Some(field.into());
        self
    }

    pub fn codec(mut self, codec: impl Into<String>) -> Self {
        self.mapping.codec = Some(codec.into());
        self
    }

    pub fn from_key(mut self, key: impl Into<String>) -> Self {
        self.mapping.from_key = Some(key.into());
        self
    }

    pub fn table_hook(mut self, name: impl Into<String>) -> Self {
        self.mapping.table_hook = Some(name.into());
        self
    }

    pub fn key_hook(mut self, name: impl Into<String>) -> Self {
        self.mapping.key_hook = Some(name.into());
        self
    }

    pub fn field_hook(mut self, name: impl Into<String>) -> Self {
        self.mapping.field_hook = Some(name.into());
        self
    }

    pub fn subtree_hook(mut self, name: impl Into<String>) -> Self {
        self.mapping.subtree_hook = Some(name.into());
        self
    }

    pub fn pre_hook(mut self, name: impl Into<String>) -> Self {
        self.mapping.pre_hook = Some(name.into());
        self
    }

    pub fn post_hook(mut self, name: impl Into<String>) -> Self {
        self.mapping.post_hook = Some(name.into());
        self
    }

    pub fn create_exclusive(mut self) -> Self {
        self.mapping.create_exclusive = true;
        self
    }

    pub fn child(mut self, child: SchemaNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: Vec<SchemaNode>) -> Self {
        self.children.extend(children);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_uint_range() {
        let ty = LeafType::uint(9216);
        assert_eq!(ty.check(&json!(9100)).unwrap(), json!(9100));
        assert_eq!(ty.check(&json!("1500")).unwrap(), json!(1500));
        assert!(ty.check(&json!(10000)).is_err());
        assert!(ty.check(&json!(-1)).is_err());
        assert!(ty.check(&json!(true)).is_err());
    }

    #[test]
    fn test_boolean_text() {
        assert_eq!(LeafType::Boolean.parse_text("false").unwrap(), json!(false));
        assert!(LeafType::Boolean.parse_text("no").is_err());
    }

    #[test]
    fn test_pattern() {
        let ty = LeafType::pattern("Vlan[0-9]+");
        assert!(ty.check(&json!("Vlan10")).is_ok());
        assert!(ty.check(&json!("xVlan10")).is_err());
    }

    #[test]
    fn test_identity_canonical_and_render() {
        let ty = LeafType::identityref("openconfig-if-ethernet", &["SPEED_10GB", "SPEED_25GB"]);
        let canonical = ty.check(&json!("openconfig-if-ethernet:SPEED_10GB")).unwrap();
        assert_eq!(canonical, json!("SPEED_10GB"));
        assert_eq!(ty.render(&canonical), json!("openconfig-if-ethernet:SPEED_10GB"));
        assert_eq!(ty.check(&json!("SPEED_25GB")).unwrap(), json!("SPEED_25GB"));
        assert!(ty.check(&json!("SPEED_1TB")).is_err());
    }

    #[test]
    fn test_union_picks_first_match() {
        let ty = LeafType::Union {
            members: vec![
                LeafType::identityref("openconfig-aaa-types", &["LOCAL", "TACACS_ALL"]),
                LeafType::string(),
            ],
        };
        assert_eq!(ty.check(&json!("openconfig-aaa-types:LOCAL")).unwrap(), json!("LOCAL"));
        assert_eq!(ty.render(&json!("LOCAL")), json!("openconfig-aaa-types:LOCAL"));
        assert_eq!(ty.check(&json!("ldap")).unwrap(), json!("ldap"));
        assert_eq!(ty.render(&json!("ldap")), json!("ldap"));
    }

    #[test]
    fn test_node_deserializes() {
        let node: SchemaNode = serde_json::from_value(json!({
            "name": "port",
            "kind": "list",
            "keys": ["name"],
            "mapping": {"table": "PORT"},
            "children": [
                {"name": "name", "kind": "leaf", "type": {"type": "string"}},
                {"name": "mtu", "kind": "leaf", "type": {"type": "uint", "max": 9216}, "default": 1500}
            ]
        }))
        .unwrap();

        assert_eq!(node.kind, NodeKind::List);
        assert_eq!(node.mapping.table.as_deref(), Some("PORT"));
        assert_eq!(node.children[1].leaf_type, Some(LeafType::uint(9216)));
        assert_eq!(node.children[1].default, Some(json!(1500)));
    }
}
