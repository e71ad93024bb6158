/*
 * time.rs
 *
 * Epoch clock and calendar conversion. Always the reentrant _r
 * variants; there is no static tm buffer anywhere.
 *
 * gmtime/localtime follow the C shape: caller owns the destination,
 * we fill it and hand the same reference back, or None when the libc
 * conversion fails (year out of range). Nothing here is reported.
 */

use core::ffi::{CStr, c_char};
use core::fmt;

use crate::allocator::RawAlloc;
use crate::error::{PortError, Result};
use crate::port::Port;
use crate::report::Reporter;

/// Calendar breakdown of an epoch timestamp.
///
/// Unlike `struct tm`, `year` is the full year and `month` counts from 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokenDownTime {
    pub year: i32,
    /// 1..=12
    pub month: u8,
    /// 1..=31
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    /// 0..=60, leap second included
    pub second: u8,
    /// 0 = Sunday
    pub weekday: u8,
    /// 0..=365
    pub yearday: u16,
    /// `None` when the platform doesn't know
    pub is_dst: Option<bool>,
    /// seconds east of UTC
    pub utc_offset: i64,
}

impl BrokenDownTime {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    #[allow(clippy::useless_conversion)] // tm_gmtoff is c_long
    fn fill_from(&mut self, tm: &libc::tm) {
        /* libc keeps every field below in range, the casts can't truncate */
        self.year = tm.tm_year.saturating_add(1900);
        self.month = (tm.tm_mon + 1) as u8;
        self.day = tm.tm_mday as u8;
        self.hour = tm.tm_hour as u8;
        self.minute = tm.tm_min as u8;
        self.second = tm.tm_sec as u8;
        self.weekday = tm.tm_wday as u8;
        self.yearday = tm.tm_yday as u16;
        self.is_dst = match tm.tm_isdst {
            0 => Some(false),
            n if n > 0 => Some(true),
            _ => None,
        };
        self.utc_offset = i64::from(tm.tm_gmtoff);
    }
}

/* ISO 8601, no zone suffix */
impl fmt::Display for BrokenDownTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

#[allow(clippy::useless_conversion)] // time_t is i64 on 64-bit targets
fn to_time_t(t: i64) -> Option<libc::time_t> {
    libc::time_t::try_from(t).ok()
}

fn zeroed_tm() -> libc::tm {
    // SAFETY: libc::tm is a C struct; all-zero (including a null tm_zone)
    // is a valid value.
    unsafe { core::mem::zeroed() }
}

impl<R: Reporter, A: RawAlloc> Port<R, A> {
    /// Seconds since the epoch.
    #[allow(clippy::useless_conversion)]
    #[must_use]
    pub fn time(&self) -> i64 {
        // SAFETY: time accepts a null out-pointer
        let now = unsafe { libc::time(core::ptr::null_mut()) };
        i64::from(now)
    }

    /// Local-time rendering in the classic `ctime` layout, without the
    /// trailing newline: `Sun Sep  9 01:46:40 2001`.
    pub fn ctime(&self, t: i64) -> Result<String> {
        let mut tm = zeroed_tm();
        if !localtime_into(t, &mut tm) {
            return Err(PortError::TimeRange(t));
        }

        let mut buf = [0 as c_char; 64];
        // SAFETY: buf is writable for buf.len() bytes, the format is a
        // NUL-terminated literal, tm was filled by localtime_r.
        let n = unsafe {
            libc::strftime(
                buf.as_mut_ptr(),
                buf.len(),
                c"%a %b %e %H:%M:%S %Y".as_ptr(),
                &raw const tm,
            )
        };
        if n == 0 {
            return Err(PortError::TimeRange(t));
        }

        // SAFETY: strftime returned non-zero, buf is NUL-terminated
        let text = unsafe { CStr::from_ptr(buf.as_ptr()) };
        Ok(text.to_string_lossy().into_owned())
    }

    /// Break `t` down as UTC into `out`.
    pub fn gmtime<'a>(
        &self,
        t: i64,
        out: &'a mut BrokenDownTime,
    ) -> Option<&'a mut BrokenDownTime> {
        let time = to_time_t(t)?;
        let mut tm = zeroed_tm();

        // SAFETY: both pointers are valid for the call
        let ok = unsafe { !libc::gmtime_r(&raw const time, &raw mut tm).is_null() };
        self.sink()
            .trace(format_args!("gmtime({t}) = {}", if ok { "ok" } else { "null" }));

        if !ok {
            return None;
        }
        out.fill_from(&tm);
        Some(out)
    }

    /// Break `t` down in the local zone into `out`.
    pub fn localtime<'a>(
        &self,
        t: i64,
        out: &'a mut BrokenDownTime,
    ) -> Option<&'a mut BrokenDownTime> {
        let mut tm = zeroed_tm();
        let ok = localtime_into(t, &mut tm);
        self.sink()
            .trace(format_args!("localtime({t}) = {}", if ok { "ok" } else { "null" }));

        if !ok {
            return None;
        }
        out.fill_from(&tm);
        Some(out)
    }
}

fn localtime_into(t: i64, tm: &mut libc::tm) -> bool {
    let Some(time) = to_time_t(t) else {
        return false;
    };
    // SAFETY: both pointers are valid for the call
    unsafe { !libc::localtime_r(&raw const time, tm).is_null() }
}
