//! Store executor for treexlate
//!
//! Commits write plans and performs batched reads.
//!
//! Commit flow (strict order):
//! 1. Normalize mutations against the committed rows (marker handling,
//!    no-op removal)
//! 2. Group mutations by database, keeping plan order
//! 3. Commit each database's group as one atomic unit
//! 4. Report what was applied
//!
//! A failure before step 3 leaves every database untouched. Databases are
//! independent: a failing group does not roll back groups already applied.

use crate::config::EngineConfig;
use crate::errors::XlateResult;
use crate::observability::{log_event, Event};
use crate::planner::{OperationPlan, ReadPlan};
use crate::store::{FieldMap, KvStore, MutationOp, PendingView, RowSet, TableMutation};

use super::result::CommitReport;

/// Executes plans against a store
pub struct StoreExecutor<'a> {
    store: &'a dyn KvStore,
    config: &'a EngineConfig,
}

impl<'a> StoreExecutor<'a> {
    pub fn new(store: &'a dyn KvStore, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    /// One consistent snapshot of every planned table
    pub fn read(&self, plan: &ReadPlan) -> XlateResult<RowSet> {
        let rows = self.store.read_batch(&plan.requests())?;
        let tables = plan.len().to_string();
        let count = rows.row_count().to_string();
        log_event(Event::SnapshotRead, &[("tables", &tables), ("rows", &count)]);
        Ok(rows)
    }

    /// Rewrite a plan so rows never end up empty by accident and no
    /// mutation is a no-op.
    ///
    /// - an empty upsert creates an absent row with the marker field
    /// - a real upsert drops the marker field
    /// - a field delete that would empty a row keeps it with the marker
    /// - deletes of absent rows or fields are dropped
    pub fn normalize(&self, mutations: &[TableMutation]) -> XlateResult<Vec<TableMutation>> {
        let marker = &self.config.marker_field;
        let mut out: Vec<TableMutation> = Vec::with_capacity(mutations.len());

        for m in mutations {
            let row = m.row();
            let current = PendingView::new(self.store, &out).get_entry(&row.db, &row.table, &row.key)?;

            match &m.op {
                MutationOp::Upsert { fields } if fields.is_empty() => {
                    if current.is_none() {
                        out.push(TableMutation::upsert(
                            &row,
                            FieldMap::with(marker.clone(), self.config.marker_value.clone()),
                        ));
                    }
                }
                MutationOp::Upsert { fields } => {
                    let real: FieldMap = fields
                        .iter()
                        .filter(|(f, _)| !self.config.is_marker(f))
                        .map(|(f, v)| (f.clone(), v.clone()))
                        .collect();
                    if real.is_empty() {
                        continue;
                    }
                    out.push(TableMutation::upsert(&row, real));
                    if current.map_or(false, |r| r.contains(marker)) {
                        out.push(TableMutation::delete_fields(&row, vec![marker.clone()]));
                    }
                }
                MutationOp::DeleteFields { fields } => {
                    let Some(current) = current else {
                        continue;
                    };
                    let present: Vec<String> = fields.iter().filter(|f| current.contains(f)).cloned().collect();
                    if present.is_empty() {
                        continue;
                    }
                    let remaining = current.fields().filter(|f| !present.contains(f)).count();
                    if remaining == 0 {
                        out.push(TableMutation::upsert(
                            &row,
                            FieldMap::with(marker.clone(), self.config.marker_value.clone()),
                        ));
                    }
                    out.push(TableMutation::delete_fields(&row, present));
                }
                MutationOp::DeleteRow => {
                    if current.is_some() {
                        out.push(m.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    /// Normalize and commit a write plan, one atomic unit per database
    pub fn commit(&self, plan: &OperationPlan) -> XlateResult<CommitReport> {
        let normalized = OperationPlan {
            oper: plan.oper,
            path: plan.path.clone(),
            mutations: self.normalize(&plan.mutations)?,
        };

        let mut report = CommitReport::default();
        for db in normalized.databases() {
            let group = normalized.for_db(&db);
            if let Err(e) = self.store.commit(&db, &group) {
                log_event(Event::StoreFailure, &[("db", &db), ("error", &e.to_string())]);
                return Err(e.into());
            }
            let count = group.len().to_string();
            log_event(Event::CommitApplied, &[("db", &db), ("mutations", &count)]);
            report.record(db, group.len());
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, RowRef};
    use crate::transformer::Operation;

    fn setup() -> (InMemoryStore, EngineConfig) {
        let config = EngineConfig::default();
        let store = InMemoryStore::new(&config);
        store
            .insert_row("CONFIG_DB", "PORT", "Ethernet0", FieldMap::with("mtu", "9100"))
            .unwrap();
        (store, config)
    }

    fn port(key: &str) -> RowRef {
        RowRef::new("CONFIG_DB", "PORT", key)
    }

    #[test]
    fn test_empty_upsert_creates_marker_row() {
        let (store, config) = setup();
        let exec = StoreExecutor::new(&store, &config);
        let out = exec
            .normalize(&[
                TableMutation::upsert(&port("Ethernet4"), FieldMap::new()),
                TableMutation::upsert(&port("Ethernet0"), FieldMap::new()),
            ])
            .unwrap();
        assert_eq!(out, vec![TableMutation::upsert(&port("Ethernet4"), FieldMap::with("NULL", "NULL"))]);
    }

    #[test]
    fn test_real_fields_replace_marker() {
        let (store, config) = setup();
        let exec = StoreExecutor::new(&store, &config);
        let mut plan = OperationPlan::new(Operation::Update, "/x");
        plan.mutations = vec![
            TableMutation::upsert(&port("Ethernet4"), FieldMap::new()),
            TableMutation::upsert(&port("Ethernet4"), FieldMap::with("mtu", "1500")),
        ];
        exec.commit(&plan).unwrap();
        assert_eq!(
            store.get_entry("CONFIG_DB", "PORT", "Ethernet4").unwrap(),
            Some(FieldMap::with("mtu", "1500"))
        );
    }

    #[test]
    fn test_deleting_last_field_keeps_row() {
        let (store, config) = setup();
        let exec = StoreExecutor::new(&store, &config);
        let mut plan = OperationPlan::new(Operation::Delete, "/x");
        plan.mutations = vec![TableMutation::delete_fields(&port("Ethernet0"), vec!["mtu".into()])];
        let report = exec.commit(&plan).unwrap();

        assert_eq!(report.mutations, 2);
        assert_eq!(
            store.get_entry("CONFIG_DB", "PORT", "Ethernet0").unwrap(),
            Some(FieldMap::with("NULL", "NULL"))
        );
    }

    #[test]
    fn test_noop_deletes_dropped() {
        let (store, config) = setup();
        let exec = StoreExecutor::new(&store, &config);
        let out = exec
            .normalize(&[
                TableMutation::delete_row(&port("Ethernet8")),
                TableMutation::delete_fields(&port("Ethernet0"), vec!["speed".into()]),
            ])
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_commit_groups_by_database() {
        let (store, config) = setup();
        let exec = StoreExecutor::new(&store, &config);
        let mut plan = OperationPlan::new(Operation::Update, "/x");
        plan.mutations = vec![
            TableMutation::upsert(&port("Ethernet0"), FieldMap::with("mtu", "1500")),
            TableMutation::upsert(&RowRef::new("STATE_DB", "PORT_TABLE", "Ethernet0"), FieldMap::with("oper_status", "up")),
        ];
        let report = exec.commit(&plan).unwrap();
        assert_eq!(report.databases, vec!["CONFIG_DB", "STATE_DB"]);
        assert_eq!(store.row_count("STATE_DB").unwrap(), 1);
    }
}
