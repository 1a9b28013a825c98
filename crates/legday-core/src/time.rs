//! Session time
//!
//! Every timestamp the pipeline sees is a TickTime: monotonic microseconds
//! since the session epoch. The driver derives it from its own clock, the
//! simulator from a manual one, so the signal code never reads a wall clock.

use std::ops::{Add, Sub};
use std::time::Duration;

/// Session-relative monotonic time, microseconds since the session epoch
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TickTime(pub u64);

impl TickTime {
    pub const ZERO: TickTime = TickTime(0);

    #[inline]
    pub fn from_micros(micros: u64) -> Self {
        TickTime(micros)
    }

    #[inline]
    pub fn from_millis(millis: u64) -> Self {
        TickTime(millis.saturating_mul(1000))
    }

    #[inline]
    pub fn from_secs_f64(secs: f64) -> Self {
        // `as` saturates: negative and NaN become zero
        TickTime((secs * 1_000_000.0).round() as u64)
    }

    /// Time elapsed since the session epoch
    #[inline]
    pub fn from_elapsed(elapsed: Duration) -> Self {
        TickTime(u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
    }

    #[inline]
    pub fn as_micros(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn as_millis(self) -> u64 {
        self.0 / 1000
    }

    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1_000_000.0
    }

    #[inline]
    pub fn saturating_add(self, duration: Duration) -> Self {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        TickTime(self.0.saturating_add(micros))
    }

    /// Duration since an earlier time, zero if `earlier` is in the future
    #[inline]
    pub fn since(self, earlier: TickTime) -> Duration {
        self - earlier
    }
}

impl Add<Duration> for TickTime {
    type Output = TickTime;

    #[inline]
    fn add(self, rhs: Duration) -> Self::Output {
        self.saturating_add(rhs)
    }
}

impl Sub<TickTime> for TickTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: TickTime) -> Self::Output {
        Duration::from_micros(self.0.saturating_sub(rhs.0))
    }
}

impl std::fmt::Debug for TickTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t({:.3}ms)", self.0 as f64 / 1000.0)
    }
}
