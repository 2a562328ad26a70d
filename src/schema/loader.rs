//! Schema loader
//!
//! Reads compiled schema descriptions from a directory of JSON files.
//! Each file holds one root node or an array of root nodes. Files are
//! read in name order so the resulting root order is stable.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::types::SchemaNode;
use crate::errors::{XlateError, XlateResult};

/// Collects schema root nodes from disk or from code
pub struct SchemaLoader {
    schema_dir: PathBuf,
    roots: Vec<SchemaNode>,
}

impl SchemaLoader {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            roots: Vec::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Load every `*.json` file in the schema directory
    pub fn load_all(&mut self) -> XlateResult<()> {
        let entries = fs::read_dir(&self.schema_dir).map_err(|e| {
            malformed(&self.schema_dir, format!("Failed to read schema directory: {}", e))
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                malformed(&self.schema_dir, format!("Failed to read directory entry: {}", e))
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            self.load_file(&path)?;
        }
        Ok(())
    }

    /// Load a single schema file
    pub fn load_file(&mut self, path: &Path) -> XlateResult<()> {
        let content = fs::read_to_string(path)
            .map_err(|e| malformed(path, format!("Failed to read file: {}", e)))?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| malformed(path, format!("Invalid JSON: {}", e)))?;

        let nodes: Vec<SchemaNode> = match value {
            Value::Array(_) => serde_json::from_value(value),
            other => serde_json::from_value(other).map(|n| vec![n]),
        }
        .map_err(|e| malformed(path, format!("Invalid schema node: {}", e)))?;

        for node in nodes {
            self.register(node)?;
        }
        Ok(())
    }

    /// Register a root node built in code
    pub fn register(&mut self, root: SchemaNode) -> XlateResult<()> {
        if self.roots.iter().any(|r| r.name == root.name) {
            return Err(XlateError::internal(format!(
                "Schema error: root '{}' registered twice",
                root.name
            )));
        }
        self.roots.push(root);
        Ok(())
    }

    pub fn roots(&self) -> &[SchemaNode] {
        &self.roots
    }

    pub fn into_roots(self) -> Vec<SchemaNode> {
        self.roots
    }
}

fn malformed(path: &Path, message: String) -> XlateError {
    XlateError::internal(format!("Schema error: {}: {}", path.display(), message))
}
