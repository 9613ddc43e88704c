use std::fmt;
use std::time::Duration;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A frame timestamp reported by the kernel, in nanoseconds since the
/// epoch of the clock the kernel stamps with (`CLOCK_REALTIME` for software
/// timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_timespec(ts: &libc::timespec) -> Self {
        Self(ts.tv_sec as i64 * NANOS_PER_SEC + ts.tv_nsec as i64)
    }

    pub const fn as_nanos(&self) -> i64 {
        self.0
    }

    /// Time since the epoch; `None` for stamps before it.
    pub fn as_duration(&self) -> Option<Duration> {
        u64::try_from(self.0).ok().map(Duration::from_nanos)
    }

    /// Signed difference `self - earlier` in nanoseconds.
    pub fn saturating_sub(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.div_euclid(NANOS_PER_SEC);
        let nanos = self.0.rem_euclid(NANOS_PER_SEC);
        write!(f, "{}.{:09}", secs, nanos)
    }
}
