/*
 * lib.rs
 *
 * One stable surface over stdio, malloc, stat, time and strerror.
 * Almost everything is a straight pass-through; the part with actual
 * logic is the overflow-checked multiplying allocator.
 */

//! # portshim
//!
//! Thin wrappers over the platform's file, memory, time and errno
//! primitives, with failures sent to an injected [`Reporter`].
//!
//! ## Quick Start
//!
//! ```rust
//! use portshim::{Port, RecordingReporter};
//!
//! let reports = RecordingReporter::new();
//! let port = Port::new(&reports);
//!
//! // 4 * 4 bytes, owned by the caller
//! let buf = port.malloc2(4, 4).unwrap().expect("non-empty");
//! assert_eq!(buf.len(), 16);
//!
//! // a zero factor means "nothing to allocate", not an error
//! assert!(port.malloc2(0, 5).unwrap().is_none());
//!
//! // overflow is reported once and refused
//! assert!(port.checked_mul2(usize::MAX, 2).is_err());
//! assert_eq!(reports.report_count(), 1);
//! ```

#[cfg(not(unix))]
compile_error!("portshim wraps POSIX stdio and only builds on unix targets");

pub mod allocator;
pub mod args;
pub mod config;
pub mod error;
pub mod file;
pub mod port;
pub mod report;
pub mod stat;
pub mod time;

pub use allocator::{LibcAlloc, RawAlloc, RawBuffer, SizeRequest};
pub use args::Args;
pub use config::Config;
pub use error::{ErrorCategory, PortError, Result, Severity, errno, exit_codes, strerror};
pub use file::{Access, File, OpenMode, SeekOrigin};
pub use port::Port;
pub use report::{
    NullReporter, RecordingReporter, Report, Reporter, StderrReporter, TracingReporter,
};
pub use stat::{FileKind, Metadata};
pub use time::BrokenDownTime;
