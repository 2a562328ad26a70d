//! ObservationScope for request begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` with elapsed time on `complete()`
//! - Logs `{name}_FAILED` on `fail()` or when dropped unfinished

use std::cell::Cell;
use std::time::Instant;

use super::logger::Logger;
use crate::errors::XlateError;

/// A scope that logs the outcome of one unit of work
///
/// ```ignore
/// let scope = ObservationScope::with_fields("XLATE_GET", &[("path", path)]);
/// // ... do work ...
/// scope.complete();
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started_at: Instant,
}

impl<'a> ObservationScope<'a> {
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a scope whose fields are repeated on every line it logs
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let event = format!("{}_BEGIN", name);
        Logger::trace(&event, fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started_at: Instant::now(),
        }
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    fn elapsed_us(&self) -> String {
        self.started_at.elapsed().as_micros().to_string()
    }

    /// Log `{name}_COMPLETE`
    pub fn complete(self) {
        self.completed.set(true);
        let event = format!("{}_COMPLETE", self.name);
        let elapsed = self.elapsed_us();
        let mut fields = self.field_refs();
        fields.push(("elapsed_us", &elapsed));
        Logger::info(&event, &fields);
    }

    /// Log `{name}_FAILED` with the error kind and message
    pub fn fail(self, err: &XlateError) {
        self.completed.set(true);
        let event = format!("{}_FAILED", self.name);
        let mut fields = self.field_refs();
        fields.push(("code", err.code().code()));
        fields.push(("message", err.message()));
        Logger::warn(&event, &fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            let event = format!("{}_FAILED", self.name);
            let mut fields = self.field_refs();
            fields.push(("reason", "dropped"));
            Logger::error(&event, &fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete() {
        let scope = ObservationScope::with_fields("TEST", &[("path", "/a")]);
        scope.complete();
    }

    #[test]
    fn test_fail() {
        let scope = ObservationScope::new("TEST");
        scope.fail(&XlateError::invalid_args("nope"));
    }

    #[test]
    fn test_drop_without_complete() {
        let _scope = ObservationScope::new("TEST");
    }
}
