//! Built-in value codecs
//!
//! Codecs turn a canonical leaf value into store text and back. Leaves
//! without a codec use the type's default text form.

use serde_json::Value;

use super::hooks::FieldCodec;
use crate::errors::{XlateError, XlateResult};
use crate::schema::LeafType;

/// Boolean stored as a pair of tokens (`up`/`down`, `on`/`off`)
pub struct BoolTokens {
    on: String,
    off: String,
}

impl BoolTokens {
    pub fn new(on: impl Into<String>, off: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            off: off.into(),
        }
    }
}

impl FieldCodec for BoolTokens {
    fn encode(&self, value: &Value, _ty: &LeafType) -> XlateResult<String> {
        match value.as_bool() {
            Some(true) => Ok(self.on.clone()),
            Some(false) => Ok(self.off.clone()),
            None => Err(XlateError::invalid_args(format!("Expected boolean, got {}", value))),
        }
    }

    fn decode(&self, text: &str, _ty: &LeafType) -> XlateResult<Value> {
        if text == self.on {
            Ok(Value::Bool(true))
        } else if text == self.off {
            Ok(Value::Bool(false))
        } else {
            Err(XlateError::internal(format!(
                "Stored value '{}' is neither '{}' nor '{}'",
                text, self.on, self.off
            )))
        }
    }
}

/// Identity stored as its bare token; stored text may also carry the
/// module prefix
pub struct IdentityCodec;

impl FieldCodec for IdentityCodec {
    fn encode(&self, value: &Value, ty: &LeafType) -> XlateResult<String> {
        let canonical = ty.check(value).map_err(XlateError::invalid_args)?;
        Ok(ty.to_db_text(&canonical))
    }

    fn decode(&self, text: &str, ty: &LeafType) -> XlateResult<Value> {
        ty.check(&Value::String(text.to_string()))
            .map_err(|e| XlateError::internal(format!("Stored identity '{}': {}", text, e)))
    }
}

/// Table-driven mapping between canonical values and store tokens
///
/// With passthrough enabled, unmapped values are stored and read verbatim
/// (left for a validator to judge); otherwise they are rejected.
pub struct ValueMapCodec {
    pairs: Vec<(String, String)>,
    passthrough: bool,
}

impl ValueMapCodec {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            pairs: pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
            passthrough: false,
        }
    }

    pub fn passthrough(mut self) -> Self {
        self.passthrough = true;
        self
    }
}

impl FieldCodec for ValueMapCodec {
    fn encode(&self, value: &Value, ty: &LeafType) -> XlateResult<String> {
        let text = ty.to_db_text(value);
        match self.pairs.iter().find(|(yang, _)| *yang == text) {
            Some((_, db)) => Ok(db.clone()),
            None if self.passthrough => Ok(text),
            None => Err(XlateError::invalid_args(format!("Unsupported value '{}'", text))),
        }
    }

    fn decode(&self, text: &str, ty: &LeafType) -> XlateResult<Value> {
        let yang = match self.pairs.iter().find(|(_, db)| db == text) {
            Some((yang, _)) => yang.as_str(),
            None if self.passthrough => text,
            None => {
                return Err(XlateError::internal(format!("Stored value '{}' has no mapping", text)));
            }
        };
        ty.parse_text(yang)
            .map_err(|e| XlateError::internal(format!("Stored value '{}': {}", text, e)))
    }
}
