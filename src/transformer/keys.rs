//! Composite row keys
//!
//! A list whose keys are folded into one store key component with a
//! separator of its own (`mode:id:sequence`). Separator and backslash
//! characters inside a component are backslash-escaped, so decoding is
//! the exact inverse of encoding for every non-empty component list.

use serde_json::Value;

use super::context::{value_text, XfmrContext};
use super::hooks::KeyHook;
use crate::errors::{XlateError, XlateResult};
use crate::store::DbKey;

/// Join components, escaping separator and backslash
pub fn encode_components(comps: &[String], separator: char) -> String {
    let mut out = String::new();
    for (i, comp) in comps.iter().enumerate() {
        if i > 0 {
            out.push(separator);
        }
        for c in comp.chars() {
            if c == separator || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
    }
    out
}

/// Split an encoded key back into components
pub fn decode_components(text: &str, separator: char) -> Result<Vec<String>, String> {
    let mut comps = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            let escaped = chars
                .next()
                .ok_or_else(|| format!("dangling escape in '{}'", text))?;
            current.push(escaped);
        } else if c == separator {
            comps.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    comps.push(current);
    Ok(comps)
}

/// Key hook folding the list's own keys into one escaped component
pub struct CompositeKey {
    separator: char,
}

impl CompositeKey {
    pub fn new(separator: char) -> Self {
        Self { separator }
    }
}

impl KeyHook for CompositeKey {
    fn to_db(&self, ctx: &XfmrContext) -> XlateResult<String> {
        let list = ctx.schema();
        let bound = ctx
            .scope
            .for_list(ctx.node)
            .ok_or_else(|| XlateError::internal(format!("keys of '{}' are not bound", list.name)))?;
        let own: Vec<String> = bound.values.iter().map(|(_, v)| value_text(v)).collect();

        let mut key = DbKey::default();
        for outer in ctx.scope.lists().iter().filter(|l| l.list != ctx.node) {
            for (_, v) in &outer.values {
                key.push(value_text(v));
            }
        }
        key.push(encode_components(&own, self.separator));
        Ok(key.join(ctx.key_separator()?))
    }

    fn from_db(&self, ctx: &XfmrContext, key: &str) -> XlateResult<Option<Vec<(String, Value)>>> {
        let list = ctx.schema();
        let outer: Vec<String> = ctx
            .scope
            .lists()
            .iter()
            .filter(|l| l.list != ctx.node)
            .flat_map(|l| l.values.iter().map(|(_, v)| value_text(v)))
            .collect();

        let parsed = DbKey::parse(key, ctx.key_separator()?);
        if parsed.len() != outer.len() + 1 || parsed.comps()[..outer.len()] != outer[..] {
            return Ok(None);
        }
        let Some(last) = parsed.last() else {
            return Ok(None);
        };
        let Ok(comps) = decode_components(last, self.separator) else {
            return Ok(None);
        };
        if comps.len() != list.keys.len() {
            return Ok(None);
        }

        let mut values = Vec::with_capacity(comps.len());
        for (name, text) in list.keys.iter().zip(comps) {
            let key_node = ctx
                .index
                .child(ctx.node, name)
                .ok_or_else(|| XlateError::internal(format!("list '{}' lost key leaf '{}'", list.name, name)))?;
            match ctx.index.node(key_node).leaf_type()?.parse_text(&text) {
                Ok(v) => values.push((name.clone(), v)),
                Err(_) => return Ok(None),
            }
        }
        Ok(Some(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_components() {
        let comps = vec!["ipv4".to_string(), "acl1".to_string(), "10".to_string()];
        let encoded = encode_components(&comps, ':');
        assert_eq!(encoded, "ipv4:acl1:10");
        assert_eq!(decode_components(&encoded, ':').unwrap(), comps);
    }

    #[test]
    fn test_escaped_components() {
        let comps = vec!["a:b".to_string(), r"c\d".to_string(), String::new()];
        let encoded = encode_components(&comps, ':');
        assert_eq!(encoded, r"a\:b:c\\d:");
        assert_eq!(decode_components(&encoded, ':').unwrap(), comps);
    }

    #[test]
    fn test_dangling_escape() {
        assert!(decode_components(r"abc\", ':').is_err());
    }
}
