/*
 * port.rs
 *
 * Port carries the collaborators: where reports go, which raw allocator
 * backs the safe allocator, and whether to trace. It holds no other
 * state. The wrapped operations themselves live next to their platform
 * calls (allocator.rs, file.rs, stat.rs, time.rs) as impl blocks on Port.
 */

use core::fmt;

use crate::allocator::{LibcAlloc, RawAlloc};
use crate::config::Config;
use crate::error::{ErrorCategory, Severity};
use crate::report::{Reporter, TracingReporter};

/// Entry point for every wrapped operation.
///
/// ```rust
/// use portshim::{Port, NullReporter};
///
/// let port = Port::new(NullReporter);
/// assert_eq!(port.checked_mul2(2, 3).unwrap(), 6);
/// ```
#[derive(Debug, Clone)]
pub struct Port<R = TracingReporter, A = LibcAlloc> {
    reporter: R,
    alloc: A,
    config: Config,
}

impl Default for Port {
    fn default() -> Self {
        Self::new(TracingReporter)
    }
}

impl<R: Reporter> Port<R, LibcAlloc> {
    /// Port backed by libc malloc/free, tracing off.
    #[must_use]
    pub fn new(reporter: R) -> Self {
        Self::with_allocator(reporter, LibcAlloc)
    }
}

impl<R: Reporter, A: RawAlloc> Port<R, A> {
    #[must_use]
    pub fn with_allocator(reporter: R, alloc: A) -> Self {
        Self {
            reporter,
            alloc,
            config: Config::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> Config {
        self.config
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub(crate) fn sink(&self) -> Sink<'_> {
        Sink {
            reporter: &self.reporter,
            trace: self.config.trace,
        }
    }
}

/// Borrowed view of a Port's reporter, handed to open streams so they
/// don't need to carry the Port's type parameters.
#[derive(Clone, Copy)]
pub(crate) struct Sink<'a> {
    reporter: &'a dyn Reporter,
    trace: bool,
}

impl Sink<'_> {
    /* every failure this layer reports is Failure-grade */
    pub(crate) fn fail(&self, category: ErrorCategory, message: fmt::Arguments<'_>) {
        self.reporter.report(Severity::Failure, category, message);
    }

    #[inline]
    pub(crate) fn trace(&self, message: fmt::Arguments<'_>) {
        if self.trace {
            self.reporter.trace(message);
        }
    }
}

impl fmt::Debug for Sink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("trace", &self.trace).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::RecordingReporter;

    #[test]
    fn test_trace_gated_by_config() {
        let rec = RecordingReporter::new();

        let quiet = Port::new(&rec);
        quiet.sink().trace(format_args!("hidden"));
        assert!(rec.traces().is_empty());

        let loud = Port::new(&rec).with_config(Config::default().with_trace(true));
        loud.sink().trace(format_args!("shown {}", 1));
        assert_eq!(rec.traces(), vec!["shown 1".to_string()]);
    }

    #[test]
    fn test_fail_reports_failure_severity() {
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        port.sink()
            .fail(ErrorCategory::OutOfMemory, format_args!("boom"));

        let reports = rec.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].severity, Severity::Failure);
        assert_eq!(reports[0].category, ErrorCategory::OutOfMemory);
    }

    #[test]
    fn test_default_port_has_tracing_off() {
        let port: Port = Port::default();
        assert!(!port.config().trace);
    }
}
