/*
 * file.rs
 *
 * stdio streams, one wrapper per call. Each forwards to the libc
 * function of the same name and adds at most a trace line and a
 * failure report.
 *
 * Reported: open, read, write, printf failures (with strerror text).
 * Not reported: seek, tell, flush, close, puts, putc. Those hand back
 * Err and let the caller decide.
 *
 * No buffering of our own. Whatever stdio does is what you get.
 */

use core::ffi::c_int;
use core::fmt;
use core::mem::ManuallyDrop;
use core::ptr::NonNull;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::allocator::RawAlloc;
use crate::error::{ErrorCategory, PortError, Result, errno, strerror};
use crate::port::{Port, Sink};
use crate::report::Reporter;

/* not every libc release binds these three */
unsafe extern "C" {
    fn rewind(stream: *mut libc::FILE);
    fn clearerr(stream: *mut libc::FILE);
    fn ungetc(c: c_int, stream: *mut libc::FILE) -> c_int;
}

/// Base access of an fopen mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    Append,
}

/// Validated fopen mode: `r`, `w` or `a`, then any of `+`, `b`, `t`, `x`,
/// `e`, `m`, each at most once and in any order.
///
/// `t` is the no-op text flag; `x`, `e` and `m` are the glibc exclusive,
/// close-on-exec and mmap extensions. Platforms that don't know one ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub access: Access,
    pub update: bool,
    pub binary: bool,
    pub text: bool,
    pub exclusive: bool,
    pub close_on_exec: bool,
    pub mmap: bool,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Result<Self> {
        let invalid = || PortError::InvalidMode(mode.to_owned());

        let mut chars = mode.chars();
        let access = match chars.next() {
            Some('r') => Access::Read,
            Some('w') => Access::Write,
            Some('a') => Access::Append,
            _ => return Err(invalid()),
        };

        let mut parsed = Self {
            access,
            update: false,
            binary: false,
            text: false,
            exclusive: false,
            close_on_exec: false,
            mmap: false,
        };
        for c in chars {
            let flag = match c {
                '+' => &mut parsed.update,
                'b' => &mut parsed.binary,
                't' => &mut parsed.text,
                'x' => &mut parsed.exclusive,
                'e' => &mut parsed.close_on_exec,
                'm' => &mut parsed.mmap,
                _ => return Err(invalid()),
            };
            if *flag {
                return Err(invalid());
            }
            *flag = true;
        }

        Ok(parsed)
    }
}

/* canonical order: access, then + b t x e m */
impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.access {
            Access::Read => "r",
            Access::Write => "w",
            Access::Append => "a",
        })?;
        for (set, c) in [
            (self.update, "+"),
            (self.binary, "b"),
            (self.text, "t"),
            (self.exclusive, "x"),
            (self.close_on_exec, "e"),
            (self.mmap, "m"),
        ] {
            if set {
                f.write_str(c)?;
            }
        }
        Ok(())
    }
}

/// Reference point for `File::seek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    Start,
    Current,
    End,
}

impl SeekOrigin {
    fn whence(self) -> c_int {
        match self {
            Self::Start => libc::SEEK_SET,
            Self::Current => libc::SEEK_CUR,
            Self::End => libc::SEEK_END,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Start => "SEEK_SET",
            Self::Current => "SEEK_CUR",
            Self::End => "SEEK_END",
        }
    }
}

/// An open stdio stream.
///
/// Closed exactly once: by [`close`](Self::close), or on drop if the
/// caller never closed it. Not shareable between threads; callers that
/// want to share a stream serialize access themselves.
pub struct File<'p> {
    stream: NonNull<libc::FILE>,
    path: String,
    sink: Sink<'p>,
}

impl<R: Reporter, A: RawAlloc> Port<R, A> {
    /// fopen. Failure is reported once with the strerror text.
    pub fn open(&self, path: impl AsRef<Path>, mode: &str) -> Result<File<'_>> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let sink = self.sink();

        /* validated, then handed to fopen exactly as the caller spelled it */
        let c_mode = match OpenMode::parse(mode).and_then(|_| {
            CString::new(mode).map_err(|_| PortError::InvalidMode(mode.to_owned()))
        }) {
            Ok(m) => m,
            Err(e) => {
                sink.fail(
                    ErrorCategory::FileIo,
                    format_args!("Failed to open \"{shown}\" file.\nInvalid access mode \"{mode}\""),
                );
                return Err(e);
            }
        };

        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            sink.fail(
                ErrorCategory::FileIo,
                format_args!("Failed to open \"{shown}\" file.\nPath contains a NUL byte"),
            );
            return Err(PortError::InvalidPath(shown));
        };

        // SAFETY: both arguments are NUL-terminated C strings
        let raw = unsafe { libc::fopen(c_path.as_ptr(), c_mode.as_ptr()) };
        let err = errno();

        sink.trace(format_args!("open({shown},{mode}) = {raw:p}"));

        match NonNull::new(raw) {
            Some(stream) => Ok(File {
                stream,
                path: shown,
                sink,
            }),
            None => {
                let message = strerror(err);
                sink.fail(
                    ErrorCategory::FileIo,
                    format_args!("Failed to open \"{shown}\" file.\n{message}"),
                );
                Err(PortError::Open {
                    path: shown,
                    errno: err,
                    message,
                })
            }
        }
    }
}

impl File<'_> {
    #[inline]
    fn raw(&self) -> *mut libc::FILE {
        self.stream.as_ptr()
    }

    /// The underlying `FILE *`, still owned by this wrapper.
    #[must_use]
    pub fn as_raw(&self) -> *mut libc::FILE {
        self.raw()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// fclose. Not reported.
    pub fn close(self) -> Result<()> {
        let this = ManuallyDrop::new(self);
        this.sink.trace(format_args!("close({:p})", this.raw()));

        // SAFETY: stream is open and ManuallyDrop stops Drop from closing it again
        let rc = unsafe { libc::fclose(this.raw()) };
        let err = errno();

        // SAFETY: the path is read out once and `this` is never touched again
        drop(unsafe { core::ptr::read(&this.path) });

        if rc == 0 {
            Ok(())
        } else {
            Err(PortError::from_errno("close", err))
        }
    }

    /// fseeko. Not reported.
    #[allow(clippy::useless_conversion)] // off_t is i64 on 64-bit targets
    pub fn seek(&mut self, offset: i64, origin: SeekOrigin) -> Result<()> {
        self.sink.trace(format_args!(
            "seek({:p},{offset},{})",
            self.raw(),
            origin.name()
        ));

        let offset = libc::off_t::try_from(offset)
            .map_err(|_| PortError::from_errno("seek", libc::EOVERFLOW))?;

        // SAFETY: stream is open
        let rc = unsafe { libc::fseeko(self.raw(), offset, origin.whence()) };
        if rc == 0 {
            Ok(())
        } else {
            Err(PortError::last_os("seek"))
        }
    }

    /// ftello. Not reported.
    pub fn tell(&mut self) -> Result<u64> {
        // SAFETY: stream is open
        let pos = unsafe { libc::ftello(self.raw()) };
        let err = errno();
        self.sink
            .trace(format_args!("tell({:p}) = {pos}", self.raw()));

        u64::try_from(pos).map_err(|_| PortError::from_errno("tell", err))
    }

    /// Back to offset 0; also clears the error flag.
    pub fn rewind(&mut self) {
        self.sink.trace(format_args!("rewind({:p})", self.raw()));
        // SAFETY: stream is open
        unsafe { rewind(self.raw()) }
    }

    /// fread of up to `count` elements of `size` bytes into `buf`.
    ///
    /// `count` is clamped to what fits in `buf`. Returns the number of
    /// whole elements read; a short count is the only failure signal. A
    /// read that returns nothing with the stream error flag set is
    /// reported.
    pub fn read(&mut self, buf: &mut [u8], size: usize, count: usize) -> usize {
        let count = clamp_count(buf.len(), size, count);
        if count == 0 {
            return 0;
        }

        // SAFETY: buf has room for size * count bytes (clamped above)
        let n = unsafe { libc::fread(buf.as_mut_ptr().cast(), size, count, self.raw()) };
        let err = errno();

        self.sink.trace(format_args!(
            "read({:p},{size},{count}) = {n}",
            self.raw()
        ));

        if n == 0 && self.error() {
            self.sink.fail(
                ErrorCategory::FileIo,
                format_args!(
                    "Failed to read {count} blocks of {size} byte(s).\n{}",
                    strerror(err)
                ),
            );
        }
        n
    }

    /// `read(buf, 1, buf.len())`
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> usize {
        let len = buf.len();
        self.read(buf, 1, len)
    }

    /// fwrite of `count` elements of `size` bytes from `buf`.
    ///
    /// Same clamping as [`read`](Self::read). A short write with the
    /// stream error flag set is reported.
    pub fn write(&mut self, buf: &[u8], size: usize, count: usize) -> usize {
        let count = clamp_count(buf.len(), size, count);
        if count == 0 {
            return 0;
        }

        // SAFETY: buf holds at least size * count readable bytes
        let n = unsafe { libc::fwrite(buf.as_ptr().cast(), size, count, self.raw()) };
        let err = errno();

        self.sink.trace(format_args!(
            "write({:p},{size},{count}) = {n}",
            self.raw()
        ));

        if n < count && self.error() {
            self.sink.fail(
                ErrorCategory::FileIo,
                format_args!(
                    "Failed to write {count} blocks of {size} byte(s).\n{}",
                    strerror(err)
                ),
            );
        }
        n
    }

    /// `write(buf, 1, buf.len())`
    pub fn write_bytes(&mut self, buf: &[u8]) -> usize {
        self.write(buf, 1, buf.len())
    }

    /// fflush. Not reported.
    pub fn flush(&mut self) -> Result<()> {
        self.sink.trace(format_args!("flush({:p})", self.raw()));
        // SAFETY: stream is open
        if unsafe { libc::fflush(self.raw()) } == 0 {
            Ok(())
        } else {
            Err(PortError::last_os("flush"))
        }
    }

    /// fgets: read one line (newline kept) of at most `buf.len() - 1`
    /// bytes. `None` at end of stream, on error, or for an empty `buf`.
    pub fn gets<'b>(&mut self, buf: &'b mut [u8]) -> Option<&'b [u8]> {
        if buf.is_empty() {
            return None;
        }
        let cap = c_int::try_from(buf.len()).unwrap_or(c_int::MAX);

        // SAFETY: buf is writable for cap bytes; fgets writes at most cap
        // bytes including the terminator.
        let got = unsafe { libc::fgets(buf.as_mut_ptr().cast(), cap, self.raw()) };
        if got.is_null() {
            return None;
        }

        let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        Some(&buf[..len])
    }

    /// fgetc. `None` at end of stream or on error.
    pub fn getc(&mut self) -> Option<u8> {
        // SAFETY: stream is open
        let c = unsafe { libc::fgetc(self.raw()) };
        u8::try_from(c).ok()
    }

    /// ungetc. `None` if the byte could not be pushed back.
    pub fn ungetc(&mut self, c: u8) -> Option<u8> {
        // SAFETY: stream is open
        let rc = unsafe { ungetc(c_int::from(c), self.raw()) };
        u8::try_from(rc).ok()
    }

    /// Formatted write. Use with `format_args!` or [`fprintf!`](crate::fprintf).
    ///
    /// Returns bytes written. Failure is reported once.
    pub fn printf(&mut self, args: fmt::Arguments<'_>) -> Result<usize> {
        let text = args.to_string();
        if text.is_empty() {
            return Ok(0);
        }

        // SAFETY: text is text.len() readable bytes
        let n = unsafe { libc::fwrite(text.as_ptr().cast(), 1, text.len(), self.raw()) };
        if n == text.len() {
            return Ok(n);
        }

        let err = errno();
        let message = strerror(err);
        self.sink.fail(
            ErrorCategory::FileIo,
            format_args!("printf() failed.\n{message}"),
        );
        Err(PortError::Format {
            errno: err,
            message,
        })
    }

    /// fputs: writes `s` as-is, no newline added. Not reported.
    pub fn puts(&mut self, s: &str) -> Result<()> {
        if s.is_empty() {
            return Ok(());
        }
        // SAFETY: s is s.len() readable bytes
        let n = unsafe { libc::fwrite(s.as_ptr().cast(), 1, s.len(), self.raw()) };
        if n == s.len() {
            Ok(())
        } else {
            Err(PortError::last_os("puts"))
        }
    }

    /// fputc. Not reported.
    pub fn putc(&mut self, c: u8) -> Result<u8> {
        // SAFETY: stream is open
        let rc = unsafe { libc::fputc(c_int::from(c), self.raw()) };
        u8::try_from(rc).map_err(|_| PortError::last_os("putc"))
    }

    /// feof
    #[must_use]
    pub fn eof(&self) -> bool {
        // SAFETY: stream is open
        unsafe { libc::feof(self.raw()) != 0 }
    }

    /// ferror
    #[must_use]
    pub fn error(&self) -> bool {
        // SAFETY: stream is open
        unsafe { libc::ferror(self.raw()) != 0 }
    }

    /// clearerr: reset both the end-of-file and error flags.
    pub fn clear_error(&mut self) {
        // SAFETY: stream is open
        unsafe { clearerr(self.raw()) }
    }
}

impl Drop for File<'_> {
    fn drop(&mut self) {
        self.sink.trace(format_args!("close({:p})", self.raw()));
        /* nobody left to hand an error to */
        // SAFETY: stream is open; close() bypasses Drop via ManuallyDrop
        unsafe {
            libc::fclose(self.raw());
        }
    }
}

impl fmt::Debug for File<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("stream", &self.stream)
            .field("path", &self.path)
            .finish()
    }
}

/* whole elements of `size` that fit in `len` bytes, capped at `count` */
fn clamp_count(len: usize, size: usize, count: usize) -> usize {
    if size == 0 {
        0
    } else {
        count.min(len / size)
    }
}

/// Formatted write to a [`File`], printf-style but with Rust format strings.
///
/// ```rust
/// # use portshim::{Port, NullReporter, fprintf};
/// # let dir = std::env::temp_dir().join(format!("portshim-doc-{}", std::process::id()));
/// # std::fs::create_dir_all(&dir).unwrap();
/// let port = Port::new(NullReporter);
/// let mut f = port.open(dir.join("out.txt"), "w").unwrap();
/// let n = fprintf!(f, "{} + {} = {}", 1, 2, 3).unwrap();
/// assert_eq!(n, 9);
/// # f.close().unwrap();
/// # std::fs::remove_dir_all(&dir).unwrap();
/// ```
#[macro_export]
macro_rules! fprintf {
    ($file:expr, $($arg:tt)*) => {
        $file.printf(::core::format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::report::{NullReporter, RecordingReporter};

    fn scratch() -> tempfile::TempDir {
        tempfile::tempdir().expect("tempdir")
    }

    #[test]
    fn test_open_mode_parse_valid() {
        for (input, canonical) in [
            ("r", "r"),
            ("rb", "rb"),
            ("r+", "r+"),
            ("rb+", "r+b"),
            ("r+b", "r+b"),
            ("w", "w"),
            ("wb", "wb"),
            ("a+", "a+"),
            ("ab+", "a+b"),
            ("rt", "rt"),
            ("wt", "wt"),
            ("re", "re"),
            ("wx", "wx"),
            ("rm", "rm"),
            ("w+bx", "w+bx"),
            ("rbe+", "r+be"),
        ] {
            let mode = OpenMode::parse(input).unwrap_or_else(|e| panic!("{input}: {e}"));
            assert_eq!(mode.to_string(), canonical);
        }
    }

    #[test]
    fn test_open_mode_parse_invalid() {
        for input in ["", "x", "t", "rw", "r++", "rbb", "rtt", "b", "+r", "r t", "wz", "r\0"] {
            assert!(
                matches!(OpenMode::parse(input), Err(PortError::InvalidMode(_))),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_open_missing_file_reports_once() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);

        let err = port
            .open(dir.path().join("missing.bin"), "rb")
            .unwrap_err();
        match err {
            PortError::Open { errno, .. } => assert_eq!(errno, libc::ENOENT),
            other => panic!("expected Open, got {other:?}"),
        }

        let reports = rec.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, ErrorCategory::FileIo);
        assert!(reports[0].message.starts_with("Failed to open \""));
        assert!(reports[0].message.contains(&strerror(libc::ENOENT)));
    }

    #[test]
    fn test_open_invalid_mode_never_touches_disk() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        let path = dir.path().join("never.txt");

        assert!(matches!(
            port.open(&path, "wz"),
            Err(PortError::InvalidMode(_))
        ));
        assert!(!path.exists());
        assert_eq!(rec.report_count(), 1);
    }

    #[test]
    fn test_open_path_with_nul() {
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        assert!(matches!(
            port.open("bad\0path", "r"),
            Err(PortError::InvalidPath(_))
        ));
        assert_eq!(rec.report_count(), 1);
    }

    #[test]
    fn test_write_then_read_back() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        let data: Vec<u8> = (0u8..=255).collect();

        let mut f = port.open(dir.path().join("rt.bin"), "w+b").unwrap();
        assert_eq!(f.write(&data, 16, 16), 16);
        f.seek(0, SeekOrigin::Start).unwrap();

        let mut back = vec![0u8; data.len()];
        assert_eq!(f.read(&mut back, 16, 16), 16);
        assert_eq!(back, data);
        f.close().unwrap();

        assert_eq!(rec.report_count(), 0);
    }

    #[test]
    fn test_read_count_clamped_to_buffer() {
        let dir = scratch();
        let port = Port::new(NullReporter);
        let path = dir.path().join("clamp.bin");
        std::fs::write(&path, [1u8; 64]).unwrap();

        let mut f = port.open(&path, "rb").unwrap();
        let mut small = [0u8; 10];
        /* asks for 8 x 4 bytes, only 2 whole elements fit */
        assert_eq!(f.read(&mut small, 4, 8), 2);
        assert_eq!(f.tell().unwrap(), 8);
        assert_eq!(f.read(&mut small, 0, 8), 0);
    }

    #[test]
    fn test_short_read_at_eof_is_not_reported() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        let path = dir.path().join("short.bin");
        std::fs::write(&path, b"abc").unwrap();

        let mut f = port.open(&path, "rb").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(f.read(&mut buf, 1, 8), 3);
        assert_eq!(f.read(&mut buf, 1, 8), 0);
        assert!(f.eof());
        assert!(!f.error());
        assert_eq!(rec.report_count(), 0);
    }

    #[test]
    fn test_read_on_write_only_stream_reports() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);

        let mut f = port.open(dir.path().join("wo.bin"), "wb").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(f.read(&mut buf, 1, 4), 0);
        assert!(f.error());

        let reports = rec.reports();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].message.starts_with("Failed to read 4 blocks of 1 byte(s)."));

        f.clear_error();
        assert!(!f.error());
    }

    #[test]
    fn test_write_on_read_only_stream_reports() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        let path = dir.path().join("ro.bin");
        std::fs::write(&path, b"data").unwrap();

        let mut f = port.open(&path, "rb").unwrap();
        assert_eq!(f.write_bytes(b"more"), 0);
        assert!(f.error());

        let reports = rec.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, ErrorCategory::FileIo);
        assert!(reports[0].message.starts_with("Failed to write 4 blocks of 1 byte(s)."));
    }

    #[test]
    fn test_open_text_mode_passes_through() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec).with_config(Config::default().with_trace(true));
        let path = dir.path().join("t.txt");
        std::fs::write(&path, b"text\n").unwrap();

        let mut f = port.open(&path, "rt").unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(f.gets(&mut buf), Some(&b"text\n"[..]));
        f.close().unwrap();

        let mut w = port.open(dir.path().join("w.txt"), "wt").unwrap();
        w.puts("ok").unwrap();
        w.close().unwrap();

        assert_eq!(rec.report_count(), 0);
        /* the caller's spelling reaches fopen, not a rewritten one */
        assert!(rec.traces()[0].contains(",rt) = "), "{:?}", rec.traces());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_exclusive_on_existing_file() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        let path = dir.path().join("exists.txt");
        std::fs::write(&path, b"x").unwrap();

        let err = port.open(&path, "wx").unwrap_err();
        assert_eq!(err.errno(), Some(libc::EEXIST));
        assert_eq!(rec.report_count(), 1);
        assert_eq!(std::fs::read(&path).unwrap(), b"x");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_printf_failure_reported_once() {
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        let mut f = port.open("/dev/full", "w").unwrap();

        /* larger than any stdio buffer, so fwrite hits the device */
        let chunk = "x".repeat(64 * 1024);
        let err = crate::fprintf!(f, "{chunk}").unwrap_err();
        match err {
            PortError::Format { errno, .. } => assert_eq!(errno, libc::ENOSPC),
            other => panic!("expected Format, got {other:?}"),
        }

        let reports = rec.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].category, ErrorCategory::FileIo);
        assert!(reports[0].message.starts_with("printf() failed.\n"));

        /* close flushes nothing new; whatever it says is not reported */
        let _ = f.close();
        assert_eq!(rec.report_count(), 1);
    }

    #[test]
    fn test_seek_tell_rewind() {
        let dir = scratch();
        let port = Port::new(NullReporter);
        let path = dir.path().join("seek.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        let mut f = port.open(&path, "r").unwrap();
        f.seek(4, SeekOrigin::Start).unwrap();
        assert_eq!(f.tell().unwrap(), 4);
        assert_eq!(f.getc(), Some(b'4'));

        f.seek(2, SeekOrigin::Current).unwrap();
        assert_eq!(f.getc(), Some(b'7'));

        f.seek(-1, SeekOrigin::End).unwrap();
        assert_eq!(f.getc(), Some(b'9'));
        assert_eq!(f.getc(), None);
        assert!(f.eof());

        f.rewind();
        assert!(!f.eof());
        assert_eq!(f.tell().unwrap(), 0);

        assert!(f.seek(-100, SeekOrigin::Start).is_err());
    }

    #[test]
    fn test_getc_ungetc() {
        let dir = scratch();
        let port = Port::new(NullReporter);
        let path = dir.path().join("gc.txt");
        std::fs::write(&path, b"xy").unwrap();

        let mut f = port.open(&path, "r").unwrap();
        assert_eq!(f.getc(), Some(b'x'));
        assert_eq!(f.ungetc(b'q'), Some(b'q'));
        assert_eq!(f.getc(), Some(b'q'));
        assert_eq!(f.getc(), Some(b'y'));
        assert_eq!(f.getc(), None);
    }

    #[test]
    fn test_gets_lines() {
        let dir = scratch();
        let port = Port::new(NullReporter);
        let path = dir.path().join("lines.txt");
        std::fs::write(&path, b"first\nsecond line\nlast").unwrap();

        let mut f = port.open(&path, "r").unwrap();
        let mut buf = [0u8; 64];
        assert_eq!(f.gets(&mut buf), Some(&b"first\n"[..]));
        assert_eq!(f.gets(&mut buf), Some(&b"second line\n"[..]));
        assert_eq!(f.gets(&mut buf), Some(&b"last"[..]));
        assert_eq!(f.gets(&mut buf), None);
        assert_eq!(f.gets(&mut []), None);
    }

    #[test]
    fn test_gets_splits_long_line() {
        let dir = scratch();
        let port = Port::new(NullReporter);
        let path = dir.path().join("long.txt");
        std::fs::write(&path, b"abcdefgh\n").unwrap();

        let mut f = port.open(&path, "r").unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(f.gets(&mut buf), Some(&b"abc"[..]));
        assert_eq!(f.gets(&mut buf), Some(&b"def"[..]));
        assert_eq!(f.gets(&mut buf), Some(&b"gh\n"[..]));
    }

    #[test]
    fn test_printf_puts_putc() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec);
        let path = dir.path().join("fmt.txt");

        let mut f = port.open(&path, "w").unwrap();
        assert_eq!(crate::fprintf!(f, "{}-{:03}", "id", 7).unwrap(), 6);
        assert_eq!(f.printf(format_args!("")).unwrap(), 0);
        f.puts(" tail").unwrap();
        assert_eq!(f.putc(b'\n').unwrap(), b'\n');
        f.close().unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"id-007 tail\n");
        assert_eq!(rec.report_count(), 0);
    }

    #[test]
    fn test_append_mode_appends() {
        let dir = scratch();
        let port = Port::new(NullReporter);
        let path = dir.path().join("app.txt");
        std::fs::write(&path, b"one\n").unwrap();

        let mut f = port.open(&path, "a").unwrap();
        f.puts("two\n").unwrap();
        drop(f);

        assert_eq!(std::fs::read(&path).unwrap(), b"one\ntwo\n");
    }

    #[test]
    fn test_trace_lines_when_enabled() {
        let dir = scratch();
        let rec = RecordingReporter::new();
        let port = Port::new(&rec).with_config(Config::default().with_trace(true));

        let mut f = port.open(dir.path().join("t.bin"), "w+").unwrap();
        f.write_bytes(b"abcd");
        f.seek(1, SeekOrigin::Start).unwrap();
        let _ = f.tell();
        f.close().unwrap();

        let traces = rec.traces();
        assert_eq!(traces.len(), 5, "{traces:?}");
        assert!(traces[0].starts_with("open("));
        assert!(traces[0].contains(",w+) = "));
        assert!(traces[1].starts_with("write("));
        assert!(traces[1].ends_with(",1,4) = 4"));
        assert!(traces[2].ends_with(",1,SEEK_SET)"));
        assert!(traces[3].ends_with(") = 1"));
        assert!(traces[4].starts_with("close("));
    }
}
