#![forbid(unsafe_code)]

//! Time sources for coordinator timers.
//!
//! Every deadline in the quiesce stack is computed against a [`Clock`]
//! handle rather than calling `Instant::now()` directly. In production the
//! clock reads real wall-clock time; in tests a shared [`LabClock`] is
//! advanced manually, which makes every timing guarantee in this workspace
//! reproducible without sleeping.
//!
//! # Invariants
//!
//! 1. All `Clock` handles cloned from the same `LabClock` observe the same
//!    time.
//! 2. Lab time never moves backwards; `advance` is the only mutation.
//! 3. A real clock is monotonic (inherited from `web_time::Instant`).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use web_time::{Duration, Instant};

// ─── LabClock ────────────────────────────────────────────────────────────────

/// A manually-advanceable clock for deterministic tests.
///
/// Clones share the same underlying offset, so a clock handed to a
/// coordinator and the handle kept by the test harness always agree.
#[derive(Debug, Clone)]
pub struct LabClock {
    epoch: Instant,
    offset_us: Arc<AtomicU64>,
}

impl LabClock {
    /// Create a new lab clock starting at `Instant::now()`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            offset_us: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Advance the lab clock by `delta`.
    pub fn advance(&self, delta: Duration) {
        let us = delta.as_micros().min(u64::MAX as u128) as u64;
        self.offset_us.fetch_add(us, Ordering::Release);
    }

    /// Advance the lab clock by whole milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Current lab time.
    #[must_use]
    pub fn now(&self) -> Instant {
        let offset = Duration::from_micros(self.offset_us.load(Ordering::Acquire));
        self.epoch + offset
    }
}

impl Default for LabClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Clock ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum ClockSource {
    /// Real wall-clock time.
    Real,
    /// Deterministic lab clock for testing.
    Lab(LabClock),
}

/// Cheaply cloneable time-source handle.
///
/// Coordinators hold a `Clock` and ask it for `now()` whenever they need a
/// timestamp; which source backs it is invisible to them.
#[derive(Debug, Clone)]
pub struct Clock {
    source: ClockSource,
}

impl Clock {
    /// A clock backed by real wall-clock time.
    #[must_use]
    pub fn real() -> Self {
        Self {
            source: ClockSource::Real,
        }
    }

    /// A clock backed by the given [`LabClock`].
    #[must_use]
    pub fn lab(clock: &LabClock) -> Self {
        Self {
            source: ClockSource::Lab(clock.clone()),
        }
    }

    /// Current time according to this clock's source.
    #[must_use]
    pub fn now(&self) -> Instant {
        match &self.source {
            ClockSource::Real => Instant::now(),
            ClockSource::Lab(c) => c.now(),
        }
    }

    /// Whether this clock uses a lab source.
    #[inline]
    #[must_use]
    pub fn is_lab(&self) -> bool {
        matches!(self.source, ClockSource::Lab(_))
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::real()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MS_50: Duration = Duration::from_millis(50);
    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn lab_clock_starts_at_epoch() {
        let lab = LabClock::new();
        assert_eq!(lab.now(), lab.now());
    }

    #[test]
    fn lab_clock_advances() {
        let lab = LabClock::new();
        let start = lab.now();
        lab.advance(MS_100);
        assert_eq!(lab.now() - start, MS_100);
    }

    #[test]
    fn lab_clock_clones_share_time() {
        let lab = LabClock::new();
        let other = lab.clone();
        lab.advance(MS_50);
        assert_eq!(lab.now(), other.now());
        other.advance(MS_50);
        assert_eq!(lab.now(), other.now());
    }

    #[test]
    fn advance_ms_matches_duration() {
        let lab = LabClock::new();
        let start = lab.now();
        lab.advance_ms(250);
        assert_eq!(lab.now() - start, Duration::from_millis(250));
    }

    #[test]
    fn clock_lab_tracks_source() {
        let lab = LabClock::new();
        let clock = Clock::lab(&lab);
        assert!(clock.is_lab());
        let t0 = clock.now();
        lab.advance(MS_100);
        assert_eq!(clock.now() - t0, MS_100);
    }

    #[test]
    fn clock_real_is_not_lab() {
        let clock = Clock::real();
        assert!(!clock.is_lab());
    }

    #[test]
    fn default_clock_is_real() {
        assert!(!Clock::default().is_lab());
    }

    #[test]
    fn real_clock_monotonic() {
        let clock = Clock::real();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }

    #[test]
    fn lab_default_equals_new() {
        let lab = LabClock::default();
        let t = lab.now();
        assert_eq!(lab.now(), t);
    }
}
