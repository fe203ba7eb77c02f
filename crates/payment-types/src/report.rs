//! Injected report sink.
//!
//! Components never write to a process-wide logger directly for their
//! observable decisions. They receive a [`Reporter`] and emit exactly one
//! [`Report`] per decision, so callers (and tests) can reconstruct what happened
//! without inspecting internal state.
//!
//! - [`TracingReporter`] forwards to `tracing` and is the default everywhere.
//! - [`MemoryReporter`] keeps entries in memory for assertions.

use std::fmt;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportLevel {
    Info,
    Error,
}

impl Display for ReportLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ReportLevel::Info => f.write_str("INFO"),
            ReportLevel::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub level: ReportLevel,
    pub message: String,
}

impl Report {
    pub fn info<M: Into<String>>(message: M) -> Self {
        Self {
            level: ReportLevel::Info,
            message: message.into(),
        }
    }

    pub fn error<M: Into<String>>(message: M) -> Self {
        Self {
            level: ReportLevel::Error,
            message: message.into(),
        }
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.level, self.message)
    }
}

pub trait Reporter: Send + Sync {
    fn report(&self, report: Report);

    fn info(&self, message: &str) {
        self.report(Report::info(message));
    }

    fn error(&self, message: &str) {
        self.report(Report::error(message));
    }
}

impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    fn report(&self, report: Report) {
        self.as_ref().report(report)
    }
}

/// Forwards every report to the installed `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, report: Report) {
        match report.level {
            ReportLevel::Info => tracing::info!("{}", report.message),
            ReportLevel::Error => tracing::error!("{}", report.message),
        }
    }
}

/// Collects reports in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<Report>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Report> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries rendered as `LEVEL:message`.
    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(|r| r.to_string()).collect()
    }

    pub fn contains(&self, level: ReportLevel, message: &str) -> bool {
        self.entries()
            .iter()
            .any(|r| r.level == level && r.message == message)
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, report: Report) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report);
    }
}
