//! JSON I/O handling for CLI
//!
//! - Payload: inline JSON or `@file`
//! - Output: single JSON object via stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Write};

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};
use crate::errors::XlateError;

/// Parse a `--payload` argument
pub fn read_payload(arg: &str) -> CliResult<Value> {
    let text = match arg.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .map_err(|e| CliError::payload_error(format!("Failed to read payload {}: {}", path, e)))?,
        None => arg.to_string(),
    };
    if text.trim().is_empty() {
        return Err(CliError::payload_error("Empty payload"));
    }
    serde_json::from_str(&text).map_err(|e| CliError::payload_error(format!("Invalid payload JSON: {}", e)))
}

/// Success envelope
pub fn success(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// Error envelope of a rejected request
pub fn failure(err: &XlateError) -> Value {
    let mut response = json!({
        "status": "error",
        "code": err.code().code(),
        "http_status": err.status_code(),
        "message": err.message(),
    });
    if let Some(path) = err.path() {
        response["path"] = json!(path);
    }
    response
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&success(data))
}

/// Write an error response to stdout
pub fn write_error(err: &XlateError) -> CliResult<()> {
    write_json(&failure(err))
}

fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
