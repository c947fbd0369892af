#![forbid(unsafe_code)]

//! One-shot deferred actions with newest-supersedes-oldest scheduling.
//!
//! A [`Deferred`] holds at most one pending deadline. Scheduling while a
//! deadline is armed replaces it; the older deadline is discarded entirely.
//! The owner drives it by polling: [`take_due`](Deferred::take_due) returns
//! `true` exactly once per armed deadline, at or after its fire time, and
//! disarms it in the same call. The action itself lives with the owner —
//! `Deferred` only answers "is it time yet".
//!
//! This is the timer primitive under both runtime coordinators: a gate's
//! pending hide, a watch's settle window. Poll-driven rather than
//! thread-backed, so a dropped owner can never observe a late fire.
//!
//! # Invariants
//!
//! 1. At most one deadline is outstanding at any time.
//! 2. `take_due` never fires before the armed deadline.
//! 3. `cancel` followed by any number of polls fires nothing.
//! 4. Re-scheduling discards the previous deadline (no double fire).

use web_time::{Duration, Instant};

/// A cancellable one-shot deadline.
#[derive(Debug, Clone, Default)]
pub struct Deferred {
    fire_at: Option<Instant>,
}

impl Deferred {
    /// An idle deferred action with nothing armed.
    #[must_use]
    pub fn idle() -> Self {
        Self { fire_at: None }
    }

    /// Arm the deadline at an absolute instant, replacing any pending one.
    pub fn schedule_at(&mut self, at: Instant) {
        self.fire_at = Some(at);
    }

    /// Arm the deadline `delay` after `now`, replacing any pending one.
    pub fn schedule_after(&mut self, now: Instant, delay: Duration) {
        self.fire_at = Some(now + delay);
    }

    /// Disarm without firing. Idempotent.
    pub fn cancel(&mut self) {
        self.fire_at = None;
    }

    /// Whether a deadline is currently armed.
    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.fire_at.is_some()
    }

    /// The armed deadline, if any.
    #[inline]
    #[must_use]
    pub fn fire_at(&self) -> Option<Instant> {
        self.fire_at
    }

    /// Consume the deadline if it is due.
    ///
    /// Returns `true` when `now` has reached the armed deadline, disarming
    /// it so the same deadline never fires twice. Returns `false` when idle
    /// or not yet due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.fire_at {
            Some(at) if now >= at => {
                self.fire_at = None;
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
