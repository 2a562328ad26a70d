//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Monotonic request counters
//! - Scoped begin/complete tracing of requests
//!
//! Observability never changes request outcomes.
//!
//! ```ignore
//! use treexlate::observability::{Logger, Event, log_event};
//!
//! Logger::info("PLAN_BUILT", &[("mutations", "3")]);
//! log_event(Event::EngineReady, &[("nodes", "120")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::ObservationScope;

/// Log a typed event at its own severity
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
