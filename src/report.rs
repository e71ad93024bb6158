/*
 * report.rs
 *
 * The two side channels every wrapper may use: "report failure" and
 * "emit trace". Injected into Port, never global.
 *
 * TracingReporter is the default. StderrReporter is for callers that
 * don't run a tracing subscriber. RecordingReporter keeps everything in
 * memory so tests can count reports.
 */

use core::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ErrorCategory, Severity};

/// Sink for failure reports and debug traces.
///
/// Messages arrive pre-formatted as `fmt::Arguments`; implementations
/// decide whether to render them at all.
pub trait Reporter {
    fn report(&self, severity: Severity, category: ErrorCategory, message: fmt::Arguments<'_>);

    fn trace(&self, message: fmt::Arguments<'_>);
}

impl<T: Reporter + ?Sized> Reporter for &T {
    fn report(&self, severity: Severity, category: ErrorCategory, message: fmt::Arguments<'_>) {
        (**self).report(severity, category, message);
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        (**self).trace(message);
    }
}

impl<T: Reporter + ?Sized> Reporter for Box<T> {
    fn report(&self, severity: Severity, category: ErrorCategory, message: fmt::Arguments<'_>) {
        (**self).report(severity, category, message);
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        (**self).trace(message);
    }
}

impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    fn report(&self, severity: Severity, category: ErrorCategory, message: fmt::Arguments<'_>) {
        (**self).report(severity, category, message);
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        (**self).trace(message);
    }
}

/// Forwards to the `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, severity: Severity, category: ErrorCategory, message: fmt::Arguments<'_>) {
        match severity {
            Severity::Fatal | Severity::Failure => {
                tracing::error!(%severity, %category, "{}", message);
            }
            Severity::Warning => tracing::warn!(%category, "{}", message),
            Severity::Debug => tracing::debug!(%category, "{}", message),
        }
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        tracing::debug!(target: "portshim::trace", "{}", message);
    }
}

/// Writes one line per report straight to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrReporter;

impl Reporter for StderrReporter {
    fn report(&self, severity: Severity, category: ErrorCategory, message: fmt::Arguments<'_>) {
        /* a failing stderr has nowhere left to report to */
        let _ = writeln!(
            std::io::stderr().lock(),
            "portshim: {severity} ({category}): {message}"
        );
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        let _ = writeln!(std::io::stderr().lock(), "portshim: trace: {message}");
    }
}

/// Drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _: Severity, _: ErrorCategory, _: fmt::Arguments<'_>) {}

    fn trace(&self, _: fmt::Arguments<'_>) {}
}

/// A single captured failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub severity: Severity,
    pub category: ErrorCategory,
    pub message: String,
}

/// Keeps every report and trace in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
    traces: Mutex<Vec<String>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the failure reports so far.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        lock(&self.reports).clone()
    }

    #[must_use]
    pub fn report_count(&self) -> usize {
        lock(&self.reports).len()
    }

    #[must_use]
    pub fn traces(&self) -> Vec<String> {
        lock(&self.traces).clone()
    }

    pub fn clear(&self) {
        lock(&self.reports).clear();
        lock(&self.traces).clear();
    }
}

/* a poisoned log is still a usable log */
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Reporter for RecordingReporter {
    fn report(&self, severity: Severity, category: ErrorCategory, message: fmt::Arguments<'_>) {
        lock(&self.reports).push(Report {
            severity,
            category,
            message: message.to_string(),
        });
    }

    fn trace(&self, message: fmt::Arguments<'_>) {
        lock(&self.traces).push(message.to_string());
    }
}
