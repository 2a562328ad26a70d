//! Built-in validators

use std::collections::BTreeSet;

use super::prefix::Prefix;
use super::Validator;
use crate::config::EngineConfig;
use crate::errors::{XlateError, XlateResult};
use crate::store::{DbKey, KvStore, MutationOp, PendingView, RowRef, TableMutation, TableRef};

/// Upserts of `table` in the plan, with their fields
fn upserts<'v>(view: &PendingView<'v>, table: &TableRef) -> impl Iterator<Item = &'v TableMutation> + 'v {
    view.mutations_for(&table.db, &table.table)
        .filter(|m| matches!(m.op, MutationOp::Upsert { .. }))
}

fn upserted_field<'m>(mutation: &'m TableMutation, field: &str) -> Option<&'m str> {
    match &mutation.op {
        MutationOp::Upsert { fields } => fields.get(field),
        _ => None,
    }
}

/// Address rows keyed `<parent><sep><addr>/<len>` must not overlap rows
/// of another parent in any watched table
pub struct UniquePrefix {
    tables: Vec<TableRef>,
}

impl UniquePrefix {
    pub fn new(tables: Vec<TableRef>) -> Self {
        Self { tables }
    }

    fn split(key: &str, separator: &str) -> Option<(String, Prefix)> {
        let parsed = DbKey::parse(key, separator);
        if parsed.len() < 2 {
            return None;
        }
        let prefix = Prefix::parse(parsed.last()?)?;
        Some((parsed.parent().join(separator), prefix))
    }
}

impl Validator for UniquePrefix {
    fn name(&self) -> &str {
        "unique-prefix"
    }

    fn validate(&self, view: &PendingView, config: &EngineConfig) -> XlateResult<()> {
        for table in &self.tables {
            let separator = config.key_separator(&table.db)?;
            for mutation in upserts(view, table) {
                let Some((parent, new)) = Self::split(&mutation.key, separator) else {
                    continue;
                };
                if view.get_entry(&table.db, &table.table, &mutation.key)?.is_none() {
                    continue;
                }

                for other_table in self.tables.iter().filter(|t| t.db == table.db) {
                    for key in view.get_keys(&other_table.db, &other_table.table)? {
                        let Some((other_parent, other)) = Self::split(&key, separator) else {
                            continue;
                        };
                        if other_parent != parent && new.overlaps(&other) {
                            return Err(XlateError::invalid_args(format!(
                                "IP {} of Interface {} overlaps with IP or IP Anycast {} of Interface {}",
                                new, parent, other, other_parent
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// A field of a shared control row derived from dependent rows; once set it
/// may only change while no pre-existing dependent rows remain
pub struct ConsistentControlField {
    dependent: TableRef,
    control: RowRef,
    field: String,
    message: Option<String>,
}

impl ConsistentControlField {
    pub fn new(dependent: TableRef, control: RowRef, field: impl Into<String>) -> Self {
        Self {
            dependent,
            control,
            field: field.into(),
            message: None,
        }
    }

    /// Message reported on conflict
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn conflict(&self, wanted: &str, existing: &str) -> XlateError {
        let message = self.message.clone().unwrap_or_else(|| {
            format!(
                "{} '{}' conflicts with the configured value '{}'",
                self.field, wanted, existing
            )
        });
        XlateError::invalid_args(message)
    }
}

impl Validator for ConsistentControlField {
    fn name(&self) -> &str {
        "consistent-control-field"
    }

    fn validate(&self, view: &PendingView, _config: &EngineConfig) -> XlateResult<()> {
        let control_table = self.control.table_ref();
        let wanted: BTreeSet<&str> = upserts(view, &control_table)
            .filter(|m| m.key == self.control.key)
            .filter_map(|m| upserted_field(m, &self.field))
            .collect();

        let mut wanted_iter = wanted.iter();
        let Some(first) = wanted_iter.next() else {
            return Ok(());
        };
        if let Some(second) = wanted_iter.next() {
            return Err(self.conflict(second, first));
        }

        let committed = view.committed();
        let existing = committed
            .get_entry(&self.control.db, &self.control.table, &self.control.key)?
            .and_then(|row| row.get(&self.field).map(str::to_string));
        let Some(existing) = existing else {
            return Ok(());
        };
        if existing == *first {
            return Ok(());
        }

        // dependents that were there before and survive this request
        let survivors = view.get_keys(&self.dependent.db, &self.dependent.table)?;
        for key in survivors {
            if committed
                .get_entry(&self.dependent.db, &self.dependent.table, &key)?
                .is_some()
            {
                return Err(self.conflict(first, &existing));
            }
        }
        Ok(())
    }
}

/// Every token of a field must come from a fixed set
pub struct AllowedTokens {
    table: TableRef,
    field: String,
    allowed: Vec<String>,
}

impl AllowedTokens {
    pub fn new(table: TableRef, field: impl Into<String>, allowed: &[&str]) -> Self {
        Self {
            table,
            field: field.into(),
            allowed: allowed.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl Validator for AllowedTokens {
    fn name(&self) -> &str {
        "allowed-tokens"
    }

    fn validate(&self, view: &PendingView, config: &EngineConfig) -> XlateResult<()> {
        let separator = config.leaf_list_separator.as_str();
        for mutation in upserts(view, &self.table) {
            let Some(value) = upserted_field(mutation, &self.field) else {
                continue;
            };
            for token in value.split(separator).filter(|t| !t.is_empty()) {
                if !self.allowed.iter().any(|a| a == token) {
                    return Err(XlateError::invalid_args(format!(
                        "Invalid value '{}' in {} of {} '{}'",
                        token, self.field, self.table.table, mutation.key
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Where a reference lives in a source row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// Field holding one name, or several joined as a leaf-list
    Field(String),
    /// Component of the row key
    KeyComponent(usize),
}

/// Rows written to `source` must only name rows that already exist in
/// `target`
pub struct ReferencedRowExists {
    source: TableRef,
    reference: Reference,
    target: TableRef,
}

impl ReferencedRowExists {
    pub fn new(source: TableRef, reference: Reference, target: TableRef) -> Self {
        Self {
            source,
            reference,
            target,
        }
    }

    fn referenced(&self, mutation: &TableMutation, config: &EngineConfig) -> XlateResult<Vec<String>> {
        Ok(match &self.reference {
            Reference::Field(field) => upserted_field(mutation, field)
                .map(|v| {
                    v.split(config.leaf_list_separator.as_str())
                        .filter(|t| !t.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            Reference::KeyComponent(i) => {
                let key = DbKey::parse(&mutation.key, config.key_separator(&self.source.db)?);
                key.get(*i).map(|c| vec![c.to_string()]).unwrap_or_default()
            }
        })
    }
}

impl Validator for ReferencedRowExists {
    fn name(&self) -> &str {
        "referenced-row-exists"
    }

    fn validate(&self, view: &PendingView, config: &EngineConfig) -> XlateResult<()> {
        let committed = view.committed();
        for mutation in upserts(view, &self.source) {
            for name in self.referenced(mutation, config)? {
                if committed
                    .get_entry(&self.target.db, &self.target.table, &name)?
                    .is_none()
                {
                    return Err(XlateError::invalid_args(format!(
                        "{} '{}' does not exist",
                        self.target.table, name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::XlateErrorCode;
    use crate::store::{FieldMap, RowSet};

    fn marker() -> FieldMap {
        FieldMap::with("NULL", "NULL")
    }

    fn intf() -> TableRef {
        TableRef::new("CONFIG_DB", "INTERFACE")
    }

    #[test]
    fn test_unique_prefix_rejects_other_parent() {
        let mut base = RowSet::new();
        base.insert(intf(), "Ethernet0|10.0.0.1/24", marker());
        let config = EngineConfig::default();
        let rule = UniquePrefix::new(vec![intf(), TableRef::new("CONFIG_DB", "LOOPBACK_INTERFACE")]);

        let plan = vec![TableMutation::upsert(
            &RowRef::new("CONFIG_DB", "LOOPBACK_INTERFACE", "Loopback0|10.0.0.9/32"),
            marker(),
        )];
        let err = rule.validate(&PendingView::new(&base, &plan), &config).unwrap_err();
        assert_eq!(err.code(), XlateErrorCode::InvalidArgs);
        assert_eq!(
            err.message(),
            "IP 10.0.0.9/32 of Interface Loopback0 overlaps with IP or IP Anycast 10.0.0.1/24 of Interface Ethernet0"
        );
    }

    #[test]
    fn test_unique_prefix_same_parent_allowed() {
        let mut base = RowSet::new();
        base.insert(intf(), "Ethernet0|10.0.0.1/24", marker());
        let plan = vec![TableMutation::upsert(&RowRef::new("CONFIG_DB", "INTERFACE", "Ethernet0|10.0.0.2/24"), marker())];
        let rule = UniquePrefix::new(vec![intf()]);
        assert!(rule.validate(&PendingView::new(&base, &plan), &EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_control_field_conflict() {
        let servers = TableRef::new("CONFIG_DB", "NTP_SERVER");
        let control = RowRef::new("CONFIG_DB", "NTP", "global");
        let mut base = RowSet::new();
        base.insert(servers.clone(), "10.1.1.1", marker());
        base.insert(control.table_ref(), "global", FieldMap::with("src_intf", "Ethernet0"));
        let rule = ConsistentControlField::new(servers.clone(), control.clone(), "src_intf").message("mismatch");

        let same = vec![TableMutation::upsert(&control, FieldMap::with("src_intf", "Ethernet0"))];
        assert!(rule.validate(&PendingView::new(&base, &same), &EngineConfig::default()).is_ok());

        let other = vec![
            TableMutation::upsert(&RowRef::new("CONFIG_DB", "NTP_SERVER", "10.2.2.2"), marker()),
            TableMutation::upsert(&control, FieldMap::with("src_intf", "Ethernet4")),
        ];
        let err = rule.validate(&PendingView::new(&base, &other), &EngineConfig::default()).unwrap_err();
        assert_eq!(err.message(), "mismatch");
    }

    #[test]
    fn test_control_field_free_without_dependents() {
        let control = RowRef::new("CONFIG_DB", "NTP", "global");
        let mut base = RowSet::new();
        base.insert(control.table_ref(), "global", FieldMap::with("src_intf", "Ethernet0"));
        let rule = ConsistentControlField::new(TableRef::new("CONFIG_DB", "NTP_SERVER"), control.clone(), "src_intf");

        let plan = vec![TableMutation::upsert(&control, FieldMap::with("src_intf", "Ethernet4"))];
        assert!(rule.validate(&PendingView::new(&base, &plan), &EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_allowed_tokens() {
        let aaa = TableRef::new("CONFIG_DB", "AAA");
        let rule = AllowedTokens::new(aaa.clone(), "login@", &["local", "tacacs+"]);
        let base = RowSet::new();
        let row = RowRef::new("CONFIG_DB", "AAA", "authentication");

        let ok = vec![TableMutation::upsert(&row, FieldMap::with("login@", "tacacs+,local"))];
        assert!(rule.validate(&PendingView::new(&base, &ok), &EngineConfig::default()).is_ok());

        let bad = vec![TableMutation::upsert(&row, FieldMap::with("login@", "local,bogus"))];
        let err = rule.validate(&PendingView::new(&base, &bad), &EngineConfig::default()).unwrap_err();
        assert!(err.message().contains("bogus"));
    }

    #[test]
    fn test_referenced_row_by_key_component() {
        let vlan = TableRef::new("CONFIG_DB", "VLAN");
        let member = TableRef::new("CONFIG_DB", "VLAN_MEMBER");
        let mut base = RowSet::new();
        base.insert(vlan.clone(), "Vlan10", marker());
        let rule = ReferencedRowExists::new(member, Reference::KeyComponent(0), vlan);

        let ok = vec![TableMutation::upsert(&RowRef::new("CONFIG_DB", "VLAN_MEMBER", "Vlan10|Ethernet0"), marker())];
        assert!(rule.validate(&PendingView::new(&base, &ok), &EngineConfig::default()).is_ok());

        let bad = vec![TableMutation::upsert(&RowRef::new("CONFIG_DB", "VLAN_MEMBER", "Vlan20|Ethernet0"), marker())];
        let err = rule.validate(&PendingView::new(&base, &bad), &EngineConfig::default()).unwrap_err();
        assert_eq!(err.message(), "VLAN 'Vlan20' does not exist");
    }
}
