//! Validation Engine
//!
//! Cross-row invariants checked after planning and before commit. Each
//! validator sees the committed store with the plan applied on top
//! ([`PendingView`]); the first failure aborts the request with nothing
//! written.

mod prefix;
mod rules;

use std::sync::Arc;

pub use prefix::Prefix;
pub use rules::{AllowedTokens, ConsistentControlField, Reference, ReferencedRowExists, UniquePrefix};

use crate::config::EngineConfig;
use crate::errors::XlateResult;
use crate::observability::{log_event, Event};
use crate::store::PendingView;

/// A cross-row invariant
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    fn validate(&self, view: &PendingView, config: &EngineConfig) -> XlateResult<()>;
}

/// Ordered set of validators
#[derive(Clone, Default)]
pub struct ValidationEngine {
    validators: Vec<Arc<dyn Validator>>,
}

impl ValidationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, validator: impl Validator + 'static) -> &mut Self {
        self.validators.push(Arc::new(validator));
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run every validator in registration order
    pub fn run(&self, view: &PendingView, config: &EngineConfig) -> XlateResult<()> {
        if view.mutations().is_empty() {
            return Ok(());
        }
        for validator in &self.validators {
            if let Err(e) = validator.validate(view, config) {
                log_event(
                    Event::ValidationFailed,
                    &[("validator", validator.name()), ("message", e.message())],
                );
                return Err(e);
            }
        }
        Ok(())
    }
}
