//! Observable engine events

use std::fmt;

use super::logger::Severity;

/// Lifecycle and request events emitted by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Configuration loaded from file
    ConfigLoaded,
    /// Schema index built
    SchemaIndexed,
    /// Engine assembled and ready to serve
    EngineReady,
    /// A hook refused the request
    HookRejected,
    /// Write plan built
    PlanBuilt,
    /// A validator refused the plan
    ValidationFailed,
    /// Mutations committed to one database
    CommitApplied,
    /// Read snapshot taken for a Get
    SnapshotRead,
    /// Store failure
    StoreFailure,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::SchemaIndexed => "SCHEMA_INDEXED",
            Event::EngineReady => "ENGINE_READY",
            Event::HookRejected => "HOOK_REJECTED",
            Event::PlanBuilt => "PLAN_BUILT",
            Event::ValidationFailed => "VALIDATION_FAILED",
            Event::CommitApplied => "COMMIT_APPLIED",
            Event::SnapshotRead => "SNAPSHOT_READ",
            Event::StoreFailure => "STORE_FAILURE",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::PlanBuilt | Event::SnapshotRead => Severity::Trace,
            Event::HookRejected | Event::ValidationFailed => Severity::Warn,
            Event::StoreFailure => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
