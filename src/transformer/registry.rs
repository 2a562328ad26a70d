//! Hook registry
//!
//! Hooks are registered under string names and referenced by name from
//! schema annotations. The engine checks at build time that every name the
//! schema mentions is registered.

use std::collections::HashMap;
use std::sync::Arc;

use super::codec::{BoolTokens, IdentityCodec};
use super::hooks::{FieldCodec, FieldHook, KeyHook, PostHook, PreHook, SubtreeHook, TableNameHook};
use crate::errors::{XlateError, XlateResult};
use crate::schema::SchemaIndex;

/// Name-indexed hook tables
#[derive(Clone, Default)]
pub struct HookRegistry {
    tables: HashMap<String, Arc<dyn TableNameHook>>,
    keys: HashMap<String, Arc<dyn KeyHook>>,
    fields: HashMap<String, Arc<dyn FieldHook>>,
    subtrees: HashMap<String, Arc<dyn SubtreeHook>>,
    pres: HashMap<String, Arc<dyn PreHook>>,
    posts: HashMap<String, Arc<dyn PostHook>>,
    codecs: HashMap<String, Arc<dyn FieldCodec>>,
}

impl HookRegistry {
    /// Registry holding the built-in codecs
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_codec("bool-up-down", BoolTokens::new("up", "down"));
        registry.register_codec("bool-on-off", BoolTokens::new("on", "off"));
        registry.register_codec("identity", IdentityCodec);
        registry
    }

    pub fn register_table_hook(&mut self, name: &str, hook: impl TableNameHook + 'static) -> &mut Self {
        self.tables.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_key_hook(&mut self, name: &str, hook: impl KeyHook + 'static) -> &mut Self {
        self.keys.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_field_hook(&mut self, name: &str, hook: impl FieldHook + 'static) -> &mut Self {
        self.fields.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_subtree_hook(&mut self, name: &str, hook: impl SubtreeHook + 'static) -> &mut Self {
        self.subtrees.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_pre_hook(&mut self, name: &str, hook: impl PreHook + 'static) -> &mut Self {
        self.pres.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_post_hook(&mut self, name: &str, hook: impl PostHook + 'static) -> &mut Self {
        self.posts.insert(name.to_string(), Arc::new(hook));
        self
    }

    pub fn register_codec(&mut self, name: &str, codec: impl FieldCodec + 'static) -> &mut Self {
        self.codecs.insert(name.to_string(), Arc::new(codec));
        self
    }

    pub fn table_hook(&self, name: &str) -> XlateResult<&dyn TableNameHook> {
        lookup(&self.tables, "table", name)
    }

    pub fn key_hook(&self, name: &str) -> XlateResult<&dyn KeyHook> {
        lookup(&self.keys, "key", name)
    }

    pub fn field_hook(&self, name: &str) -> XlateResult<&dyn FieldHook> {
        lookup(&self.fields, "field", name)
    }

    pub fn subtree_hook(&self, name: &str) -> XlateResult<&dyn SubtreeHook> {
        lookup(&self.subtrees, "subtree", name)
    }

    pub fn pre_hook(&self, name: &str) -> XlateResult<&dyn PreHook> {
        lookup(&self.pres, "pre", name)
    }

    pub fn post_hook(&self, name: &str) -> XlateResult<&dyn PostHook> {
        lookup(&self.posts, "post", name)
    }

    pub fn codec(&self, name: &str) -> XlateResult<&dyn FieldCodec> {
        lookup(&self.codecs, "codec", name)
    }

    fn contains(&self, kind: &str, name: &str) -> bool {
        match kind {
            "table" => self.tables.contains_key(name),
            "key" => self.keys.contains_key(name),
            "field" => self.fields.contains_key(name),
            "subtree" => self.subtrees.contains_key(name),
            "pre" => self.pres.contains_key(name),
            "post" => self.posts.contains_key(name),
            "codec" => self.codecs.contains_key(name),
            _ => false,
        }
    }

    /// Every hook the schema names must be registered
    pub fn check_index(&self, index: &SchemaIndex) -> XlateResult<()> {
        for (node, kind, name) in index.hook_refs() {
            if !self.contains(kind, name) {
                return Err(XlateError::internal(format!(
                    "{} names unregistered {} hook '{}'",
                    index.node(node).xpath,
                    kind,
                    name
                )));
            }
        }
        Ok(())
    }
}

fn lookup<'a, T: ?Sized>(map: &'a HashMap<String, Arc<T>>, kind: &str, name: &str) -> XlateResult<&'a T> {
    map.get(name)
        .map(|h| h.as_ref())
        .ok_or_else(|| XlateError::internal(format!("No {} hook registered as '{}'", kind, name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::schema::{LeafType, SchemaNode};

    #[test]
    fn test_builtin_codecs_registered() {
        let registry = HookRegistry::new();
        assert!(registry.codec("bool-up-down").is_ok());
        assert!(registry.codec("bool-on-off").is_ok());
        assert!(registry.codec("nope").is_err());
    }

    #[test]
    fn test_check_index_reports_missing_hook() {
        let root = SchemaNode::container("top")
            .module("m")
            .child(SchemaNode::leaf("x", LeafType::string()).table("T").row_key("k").field_hook("missing"));
        let index = SchemaIndex::build(vec![root], &EngineConfig::default()).unwrap();

        let err = HookRegistry::new().check_index(&index).unwrap_err();
        assert!(err.message().contains("missing"));
    }
}
