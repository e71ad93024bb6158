/*
 * stat.rs
 *
 * stat(2) with the bits callers actually look at pulled out into a
 * plain struct. Failure comes back as Err with errno, never reported.
 */

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::allocator::RawAlloc;
use crate::error::{PortError, Result, errno};
use crate::port::Port;
use crate::report::Reporter;

/// File type from `st_mode & S_IFMT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
    Unknown,
}

impl FileKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Directory => "directory",
            Self::Symlink => "symlink",
            Self::CharDevice => "char-device",
            Self::BlockDevice => "block-device",
            Self::Fifo => "fifo",
            Self::Socket => "socket",
            Self::Unknown => "unknown",
        }
    }

    fn from_mode(mode: libc::mode_t) -> Self {
        match mode & libc::S_IFMT {
            libc::S_IFREG => Self::Regular,
            libc::S_IFDIR => Self::Directory,
            libc::S_IFLNK => Self::Symlink,
            libc::S_IFCHR => Self::CharDevice,
            libc::S_IFBLK => Self::BlockDevice,
            libc::S_IFIFO => Self::Fifo,
            libc::S_IFSOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }
}

/// What `stat` found. Timestamps are epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub size: u64,
    pub kind: FileKind,
    /// permission bits only (`st_mode & 0o7777`)
    pub mode: u32,
    pub accessed: i64,
    pub modified: i64,
    pub changed: i64,
}

impl Metadata {
    #[allow(clippy::useless_conversion)] // field widths differ per platform
    fn from_raw(st: &libc::stat) -> Self {
        Self {
            size: u64::try_from(st.st_size).unwrap_or(0),
            kind: FileKind::from_mode(st.st_mode),
            mode: u32::from(st.st_mode) & 0o7777,
            accessed: i64::from(st.st_atime),
            modified: i64::from(st.st_mtime),
            changed: i64::from(st.st_ctime),
        }
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::Regular
    }
}

impl<R: Reporter, A: RawAlloc> Port<R, A> {
    /// stat(2), following symlinks.
    pub fn stat(&self, path: impl AsRef<Path>) -> Result<Metadata> {
        let path = path.as_ref();
        let c_path = CString::new(path.as_os_str().as_bytes())
            .map_err(|_| PortError::InvalidPath(path.display().to_string()))?;

        // SAFETY: libc::stat is a C struct with no invalid bit patterns; zeroing is valid.
        let mut st: libc::stat = unsafe { core::mem::zeroed() };

        // SAFETY: c_path is NUL-terminated, st is valid for writes
        let rc = unsafe { libc::stat(c_path.as_ptr(), &raw mut st) };
        let err = errno();

        self.sink()
            .trace(format_args!("stat({}) = {rc}", path.display()));

        if rc == 0 {
            Ok(Metadata::from_raw(&st))
        } else {
            Err(PortError::from_errno("stat", err))
        }
    }
}
