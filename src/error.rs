/*
 * error.rs
 *
 * One error type for the whole crate, plus the errno plumbing every
 * wrapper needs. Reports go through the Reporter; this is only what
 * the caller gets back.
 *
 * Exit codes are for the CLI. Scripts may depend on them.
 */

use core::ffi::c_char;
use core::fmt;

use thiserror::Error;

use crate::allocator::SizeRequest;

/// exit codes for the portshim binary. don't change these.
pub mod exit_codes {
    /// Everything worked
    pub const SUCCESS: u8 = 0;
    /// The requested operation failed (I/O, allocation, conversion)
    pub const FAILURE: u8 = 1;
    /// Bad command line
    pub const USAGE: u8 = 2;
}

/// How bad a reported condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Warning,
    Failure,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Warning => "warning",
            Self::Failure => "failure",
            Self::Fatal => "fatal",
        })
    }
}

/// What kind of thing went wrong, for the error-reporting sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// open/read/write/printf failures
    FileIo,
    /// allocation failures and size multiplication overflow
    OutOfMemory,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FileIo => "file i/o",
            Self::OutOfMemory => "out of memory",
        })
    }
}

/* everything that can go wrong */
#[derive(Debug, Error)]
pub enum PortError {
    #[error("failed to open \"{path}\": {message}")]
    Open {
        path: String,
        errno: i32,
        message: String,
    },

    #[error("invalid access mode: {0:?}")]
    InvalidMode(String),

    #[error("path contains an interior NUL byte: {0:?}")]
    InvalidPath(String),

    #[error("multiplication overflow: {0}")]
    Overflow(SizeRequest),

    #[error("out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    #[error("formatted write failed: {message}")]
    Format { errno: i32, message: String },

    #[error("{op} failed: {message}")]
    Os {
        op: &'static str,
        errno: i32,
        message: String,
    },

    #[error("time value {0} cannot be represented")]
    TimeRange(i64),
}

impl PortError {
    /// Build an `Os` error from the current errno.
    #[must_use]
    pub fn last_os(op: &'static str) -> Self {
        Self::from_errno(op, errno())
    }

    #[must_use]
    pub fn from_errno(op: &'static str, errno: i32) -> Self {
        Self::Os {
            op,
            errno,
            message: strerror(errno),
        }
    }

    /// errno carried by this error, if the platform produced one
    #[must_use]
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Open { errno, .. } | Self::Format { errno, .. } | Self::Os { errno, .. } => {
                Some(*errno)
            }
            Self::InvalidMode(_)
            | Self::InvalidPath(_)
            | Self::Overflow(_)
            | Self::OutOfMemory(_)
            | Self::TimeRange(_) => None,
        }
    }

    #[must_use]
    pub fn exit_code(&self) -> u8 {
        exit_codes::FAILURE
    }
}

pub type Result<T> = core::result::Result<T, PortError>;

/// Read the calling thread's errno.
#[cfg(any(target_os = "linux", target_os = "android", target_os = "emscripten"))]
#[must_use]
pub fn errno() -> i32 {
    // SAFETY: __errno_location always returns a valid pointer to the
    // thread-local errno.
    unsafe { *libc::__errno_location() }
}

/// Read the calling thread's errno.
#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
#[must_use]
pub fn errno() -> i32 {
    // SAFETY: __error always returns a valid pointer to the thread-local errno.
    unsafe { *libc::__error() }
}

/// Read the calling thread's errno.
#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "emscripten",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
)))]
#[must_use]
pub fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

/// Map a platform error code to its message.
///
/// Uses the reentrant `strerror_r`. Codes the platform doesn't know come
/// back as `Unknown error N`.
#[must_use]
pub fn strerror(errnum: i32) -> String {
    let mut buf = [0 as c_char; 256];

    // SAFETY: buf is writable for buf.len() bytes; strerror_r (XSI flavour,
    // which libc binds on every unix target) NUL-terminates on success.
    let rc = unsafe { libc::strerror_r(errnum, buf.as_mut_ptr(), buf.len()) };
    if rc != 0 {
        return format!("Unknown error {errnum}");
    }

    // SAFETY: strerror_r returned 0, so buf holds a NUL-terminated string.
    let msg = unsafe { core::ffi::CStr::from_ptr(buf.as_ptr()) };
    msg.to_string_lossy().into_owned()
}
