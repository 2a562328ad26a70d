//! Reusable hooks
//!
//! - [`KeyedTableHook`]: pick a list's table from one of its key values
//! - [`DenyOperations`]: refuse selected operations at a node
//! - [`ClearOnLastRow`]: drop control-row fields once no dependent rows remain

use super::context::{Operation, XfmrContext};
use super::hooks::{PostHook, PreHook, TableNameHook};
use crate::errors::{XlateError, XlateErrorCode, XlateResult};
use crate::store::{KvStore, PendingView, RowRef, TableMutation, TableRef};

/// How a key value selects a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRule {
    Prefix(String),
    Exact(String),
}

impl TableRule {
    fn matches(&self, value: &str) -> bool {
        match self {
            TableRule::Prefix(p) => value.starts_with(p.as_str()),
            TableRule::Exact(e) => value == e,
        }
    }
}

/// Chooses the table of a list from the value of one key
pub struct KeyedTableHook {
    key: String,
    rules: Vec<(TableRule, String)>,
}

impl KeyedTableHook {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            rules: Vec::new(),
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>, table: impl Into<String>) -> Self {
        self.rules.push((TableRule::Prefix(prefix.into()), table.into()));
        self
    }

    pub fn exact(mut self, value: impl Into<String>, table: impl Into<String>) -> Self {
        self.rules.push((TableRule::Exact(value.into()), table.into()));
        self
    }

    /// Table for a key value, if any rule matches
    pub fn table_for(&self, value: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(rule, _)| rule.matches(value))
            .map(|(_, table)| table.as_str())
    }
}

impl TableNameHook for KeyedTableHook {
    fn tables(&self, ctx: &XfmrContext) -> XlateResult<Vec<String>> {
        match ctx.key_text(&self.key) {
            Some(value) => self
                .table_for(&value)
                .map(|t| vec![t.to_string()])
                .ok_or_else(|| {
                    XlateError::invalid_args(format!("Unsupported {} '{}'", self.key, value))
                }),
            None => {
                let mut tables: Vec<String> = Vec::new();
                for (_, table) in &self.rules {
                    if !tables.contains(table) {
                        tables.push(table.clone());
                    }
                }
                Ok(tables)
            }
        }
    }
}

/// Refuses the listed operations when they target the hooked node
pub struct DenyOperations {
    operations: Vec<Operation>,
    code: XlateErrorCode,
    message: String,
    include_descendants: bool,
}

impl DenyOperations {
    pub fn new(operations: &[Operation], code: XlateErrorCode, message: impl Into<String>) -> Self {
        Self {
            operations: operations.to_vec(),
            code,
            message: message.into(),
            include_descendants: false,
        }
    }

    /// Also refuse requests that target nodes below the hooked node
    pub fn include_descendants(mut self) -> Self {
        self.include_descendants = true;
        self
    }
}

impl PreHook for DenyOperations {
    fn check(&self, ctx: &XfmrContext) -> XlateResult<()> {
        let applies = ctx.is_target() || self.include_descendants;
        if applies && self.operations.contains(&ctx.oper) {
            return Err(XlateError::new(self.code, self.message.clone()).with_path(ctx.path.text.clone()));
        }
        Ok(())
    }
}

/// After a Delete, clears fields of a control row when the last row of a
/// dependent table is gone
pub struct ClearOnLastRow {
    dependent: TableRef,
    control: RowRef,
    fields: Vec<String>,
}

impl ClearOnLastRow {
    pub fn new(dependent: TableRef, control: RowRef, fields: &[&str]) -> Self {
        Self {
            dependent,
            control,
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl PostHook for ClearOnLastRow {
    fn adjust(&self, ctx: &XfmrContext, mutations: &mut Vec<TableMutation>) -> XlateResult<()> {
        if ctx.oper != Operation::Delete {
            return Ok(());
        }

        let present: Vec<String> = {
            let view = PendingView::new(ctx.store, mutations.as_slice());
            if !view.get_keys(&self.dependent.db, &self.dependent.table)?.is_empty() {
                return Ok(());
            }
            match view.get_entry(&self.control.db, &self.control.table, &self.control.key)? {
                Some(row) => self.fields.iter().filter(|f| row.contains(f)).cloned().collect(),
                None => Vec::new(),
            }
        };

        if !present.is_empty() {
            mutations.push(TableMutation::delete_fields(&self.control, present));
        }
        Ok(())
    }
}
