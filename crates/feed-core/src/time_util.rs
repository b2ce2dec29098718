//! Time utilities.
//!
//! Wall-clock timestamps via `clock_gettime(CLOCK_REALTIME)` on Linux and
//! `SystemTime` elsewhere, plus the epoch normalization applied to every wire
//! timestamp before it reaches a [`Trade`](crate::Trade).

/// Wire timestamps below this value are seconds, at or above it milliseconds.
///
/// `1e11` seconds is year 5138; `1e11` milliseconds is March 1973.
pub const SECONDS_MS_BOUNDARY: f64 = 1e11;

#[cfg(target_os = "linux")]
#[inline]
fn clock_realtime() -> (u64, u64) {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: CLOCK_REALTIME is always valid. Failure returns -1 but the
    // zeroed ts is a safe fallback (epoch).
    unsafe {
        libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts);
    }
    (ts.tv_sec as u64, ts.tv_nsec as u64)
}

#[cfg(not(target_os = "linux"))]
#[inline]
fn clock_realtime() -> (u64, u64) {
    use std::time::{SystemTime, UNIX_EPOCH};
    let d = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    (d.as_secs(), d.subsec_nanos() as u64)
}

/// Current time as **milliseconds** since Unix epoch.
#[inline]
pub fn now_ms() -> u64 {
    let (sec, nsec) = clock_realtime();
    sec * 1_000 + nsec / 1_000_000
}

/// Normalize a wire timestamp (seconds or milliseconds) to epoch milliseconds.
///
/// Fractional seconds are kept to millisecond precision. Returns `None` for
/// negative, NaN or infinite input, and for values past the `u64` range.
#[inline]
pub fn to_epoch_ms(wire: f64) -> Option<u64> {
    if !wire.is_finite() || wire < 0.0 {
        return None;
    }
    let ms = (if wire < SECONDS_MS_BOUNDARY { wire * 1000.0 } else { wire }).round();
    // `as u64` saturates; 2^64 itself is out of range.
    if ms >= u64::MAX as f64 {
        return None;
    }
    Some(ms as u64)
}
