//! Translation Engine
//!
//! Entry point for callers. Every request runs the same stages:
//!
//! Get:  resolve → plan reads → snapshot → assemble → filter → wrap
//! Set:  resolve → pre hooks → plan → post hooks → validate → commit
//!
//! Set-family requests hold the writer lock from planning through commit,
//! so validators and the executor see the store the plan was built on.
//! Gets never take it; each Get reads from one consistent snapshot.

use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use crate::assembler::{wrap, TreeAssembler};
use crate::config::EngineConfig;
use crate::errors::{XlateError, XlateResult};
use crate::executor::{CommitReport, StoreExecutor};
use crate::observability::{log_event, Event, Logger, MetricsRegistry, MetricsSnapshot, ObservationScope};
use crate::path::{PathResolver, ResolvedPath};
use crate::planner::{plan_reads, OperationPlan, Planner};
use crate::query::{QueryFilter, QueryParameters};
use crate::schema::{NodeId, SchemaIndex, SchemaNode};
use crate::store::{InMemoryStore, KvStore, PendingView, TableMutation};
use crate::transformer::{HookRegistry, Operation, XfmrChain};
use crate::validation::ValidationEngine;

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: EngineConfig,
    roots: Vec<SchemaNode>,
    hooks: HookRegistry,
    validators: ValidationEngine,
    store: Option<Arc<dyn KvStore>>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            roots: Vec::new(),
            hooks: HookRegistry::new(),
            validators: ValidationEngine::new(),
            store: None,
        }
    }

    pub fn schema(mut self, root: SchemaNode) -> Self {
        self.roots.push(root);
        self
    }

    pub fn schemas(mut self, roots: impl IntoIterator<Item = SchemaNode>) -> Self {
        self.roots.extend(roots);
        self
    }

    pub fn hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn validators(mut self, validators: ValidationEngine) -> Self {
        self.validators = validators;
        self
    }

    /// Backing store; an empty [`InMemoryStore`] when not set
    pub fn store(mut self, store: Arc<dyn KvStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Index the schema and check every hook it names is registered
    pub fn build(self) -> XlateResult<Engine> {
        Logger::set_min_severity(self.config.severity());

        let index = SchemaIndex::build(self.roots, &self.config)?;
        self.hooks.check_index(&index)?;
        let nodes = index.len().to_string();
        log_event(Event::SchemaIndexed, &[("nodes", &nodes)]);

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryStore::new(&self.config)),
        };

        let validators = self.validators.len().to_string();
        log_event(Event::EngineReady, &[("nodes", &nodes), ("validators", &validators)]);

        Ok(Engine {
            config: self.config,
            index,
            hooks: self.hooks,
            validators: self.validators,
            store,
            writer: Mutex::new(()),
            metrics: MetricsRegistry::new(),
        })
    }
}

/// The translation engine
pub struct Engine {
    config: EngineConfig,
    index: SchemaIndex,
    hooks: HookRegistry,
    validators: ValidationEngine,
    store: Arc<dyn KvStore>,
    writer: Mutex<()>,
    metrics: MetricsRegistry,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &SchemaIndex {
        &self.index
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Read the tree at `path`, shaped by `params`.
    ///
    /// Returns `{"module:name": content}`, or `{}` when the target holds
    /// no data.
    pub fn get(&self, path: &str, params: &QueryParameters) -> XlateResult<Value> {
        self.observe(Operation::Get, path, || {
            let resolved = PathResolver::new(&self.index).resolve(path)?;
            let target = resolved.target();
            let filter = QueryFilter::new(&self.index, target);
            filter.check(params)?;

            let scope = resolved.scope();
            let reads = plan_reads(&self.chain(Operation::Get, &resolved, self.store.as_ref()), target, &scope)?;
            let snapshot = StoreExecutor::new(self.store.as_ref(), &self.config).read(&reads)?;
            self.metrics.add_rows_read(snapshot.row_count() as u64);

            let chain = self.chain(Operation::Get, &resolved, &snapshot);
            let content = TreeAssembler::new(&chain).assemble()?;
            let content = filter.apply(params, content)?;
            Ok(wrap(&self.index, &resolved, content))
        })
    }

    /// Create `payload` at `path`; existing data is merged
    pub fn create(&self, path: &str, payload: &Value) -> XlateResult<CommitReport> {
        self.write(Operation::Create, path, Some(payload))
    }

    /// Merge `payload` into the data at `path`
    pub fn update(&self, path: &str, payload: &Value) -> XlateResult<CommitReport> {
        self.write(Operation::Update, path, Some(payload))
    }

    /// Make the data at `path` exactly `payload`
    pub fn replace(&self, path: &str, payload: &Value) -> XlateResult<CommitReport> {
        self.write(Operation::Replace, path, Some(payload))
    }

    pub fn delete(&self, path: &str) -> XlateResult<CommitReport> {
        self.write(Operation::Delete, path, None)
    }

    /// Build the write plan a request would commit, without committing it
    pub fn plan(&self, oper: Operation, path: &str, payload: Option<&Value>) -> XlateResult<OperationPlan> {
        let resolved = PathResolver::new(&self.index).resolve(path)?;
        let chain = self.chain(oper, &resolved, self.store.as_ref());
        self.build_plan(&chain, payload)
    }

    fn write(&self, oper: Operation, path: &str, payload: Option<&Value>) -> XlateResult<CommitReport> {
        self.observe(oper, path, || {
            let _writer = self
                .writer
                .lock()
                .map_err(|_| XlateError::internal("writer lock poisoned"))?;

            let resolved = PathResolver::new(&self.index).resolve(path)?;
            let chain = self.chain(oper, &resolved, self.store.as_ref());
            let plan = self.build_plan(&chain, payload)?;

            let view = PendingView::new(self.store.as_ref(), &plan.mutations);
            if let Err(e) = self.validators.run(&view, &self.config) {
                self.metrics.increment_validation_failures();
                return Err(e);
            }

            let report = StoreExecutor::new(self.store.as_ref(), &self.config).commit(&plan)?;
            self.metrics.add_mutations(report.mutations as u64);
            Ok(report)
        })
    }

    fn build_plan(&self, chain: &XfmrChain, payload: Option<&Value>) -> XlateResult<OperationPlan> {
        self.run_pre_hooks(chain)?;
        let mut plan = match (chain.oper, payload) {
            (Operation::Delete, _) => Planner::plan_delete(chain)?,
            (oper, Some(payload)) if oper.is_set() => Planner::plan_set(chain, payload)?,
            (oper, _) => {
                return Err(XlateError::invalid_args(format!("{} requires a payload", oper)));
            }
        };
        self.run_post_hooks(chain, &mut plan.mutations)?;

        let count = plan.len().to_string();
        log_event(
            Event::PlanBuilt,
            &[("oper", chain.oper.name()), ("path", &plan.path), ("mutations", &count)],
        );
        Ok(plan)
    }

    fn chain<'a>(&'a self, oper: Operation, path: &'a ResolvedPath, store: &'a dyn KvStore) -> XfmrChain<'a> {
        XfmrChain {
            index: &self.index,
            hooks: &self.hooks,
            config: &self.config,
            store,
            oper,
            path,
        }
    }

    /// Pre hooks of every node on the path, root first
    fn run_pre_hooks(&self, chain: &XfmrChain) -> XlateResult<()> {
        let scope = chain.path.scope();
        for elem in &chain.path.elems {
            let node = self.index.node(elem.node);
            let Some(name) = &node.mapping.pre_hook else {
                continue;
            };
            let ctx_scope = scope.enclosing(&self.index, elem.node);
            let ctx = chain.context(elem.node, &ctx_scope, None);
            if let Err(e) = self.hooks.pre_hook(name)?.check(&ctx) {
                log_event(
                    Event::HookRejected,
                    &[("hook", name), ("node", &node.xpath), ("message", e.message())],
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Post hooks of the path and of everything below the target
    fn run_post_hooks(&self, chain: &XfmrChain, mutations: &mut Vec<TableMutation>) -> XlateResult<()> {
        let scope = chain.path.scope();
        let target = chain.path.target();
        let nodes: Vec<NodeId> = chain
            .path
            .elems
            .iter()
            .map(|e| e.node)
            .chain(self.index.descendants(target))
            .collect();

        for id in nodes {
            let Some(name) = &self.index.node(id).mapping.post_hook else {
                continue;
            };
            let ctx_scope = scope.enclosing(&self.index, id);
            let ctx = chain.context(id, &ctx_scope, None);
            self.hooks.post_hook(name)?.adjust(&ctx, mutations)?;
        }
        Ok(())
    }

    /// Count the request and log its outcome under a fresh request id
    fn observe<T>(&self, oper: Operation, path: &str, run: impl FnOnce() -> XlateResult<T>) -> XlateResult<T> {
        self.metrics.record_request(oper);
        let request_id = Uuid::new_v4().to_string();
        let name = format!("XLATE_{}", oper.name());
        let scope = ObservationScope::with_fields(&name, &[("request_id", &request_id), ("path", path)]);

        match run() {
            Ok(value) => {
                scope.complete();
                Ok(value)
            }
            Err(e) => {
                self.metrics.increment_rejected();
                scope.fail(&e);
                Err(e)
            }
        }
    }
}
