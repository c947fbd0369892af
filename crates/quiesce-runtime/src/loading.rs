#![forbid(unsafe_code)]

//! Minimum-display-time smoothing for busy indicators.
//!
//! A [`LoadingGate`] converts a raw, possibly flickery busy signal into a
//! stable visible one: once the visible flag turns on, it stays on for at
//! least the configured floor duration, measured from the moment the busy
//! phase started. Operations slower than the floor pass through untouched —
//! the gate only ever delays hiding, never showing.
//!
//! The gate is poll-driven. `observe` is called with the upstream busy flag
//! whenever it (or the configuration) changes, and `poll` is called on
//! event-loop ticks to settle a pending hide whose floor has elapsed. Both
//! return the current visible flag.
//!
//! # Invariants
//!
//! 1. Once visible turns on, it stays on for at least the floor duration
//!    measured from the start of the busy phase.
//! 2. A busy signal that returns before the floor elapses does NOT restart
//!    the floor; the original start instant keeps governing the pending
//!    hide, and the stale hide deadline is cancelled so it cannot turn the
//!    indicator off under the renewed busy phase.
//! 3. When disabled, visible mirrors the raw signal exactly, with no delay
//!    and no floor bookkeeping carried across the disabled span.
//! 4. At most one hide deadline is outstanding; dropping the gate cancels
//!    it (nothing fires after teardown).
//!
//! # Failure Modes
//!
//! None. The gate is a pure state derivation over local timers: it never
//! blocks, never errors, and touches nothing but its own fields.

use quiesce_core::{Clock, Deferred};
use tracing::trace;
use web_time::{Duration, Instant};

use crate::registry::Coordinator;

/// Default floor duration, tuned against perceived loader flicker.
pub const DEFAULT_MIN_DISPLAY: Duration = Duration::from_millis(800);

/// Busy-signal smoothing gate with a minimum visible floor.
#[derive(Debug)]
pub struct LoadingGate {
    clock: Clock,
    min_display: Duration,
    enabled: bool,
    actual: bool,
    visible: bool,
    busy_started_at: Option<Instant>,
    hide: Deferred,
}

impl LoadingGate {
    /// Create a gate with the given floor, backed by the real clock.
    #[must_use]
    pub fn new(min_display: Duration) -> Self {
        Self::with_clock(Clock::real(), min_display)
    }

    /// Create a gate with an explicit clock (lab clocks for tests).
    #[must_use]
    pub fn with_clock(clock: Clock, min_display: Duration) -> Self {
        Self {
            clock,
            min_display,
            enabled: true,
            actual: false,
            visible: false,
            busy_started_at: None,
            hide: Deferred::idle(),
        }
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Feed the raw busy flag and return the derived visible flag.
    ///
    /// Call whenever the upstream flag changes; calling with an unchanged
    /// flag is a no-op apart from settling a due hide deadline.
    pub fn observe(&mut self, actual: bool) -> bool {
        let now = self.clock.now();
        self.settle_due(now);

        if !self.enabled {
            // Pure passthrough: no floor bookkeeping survives this branch.
            self.actual = actual;
            self.visible = actual;
            self.busy_started_at = None;
            self.hide.cancel();
            return self.visible;
        }

        let was = self.actual;
        self.actual = actual;

        if actual && !was {
            self.visible = true;
            // A stale hide deadline must not turn off the renewed phase.
            self.hide.cancel();
            if self.busy_started_at.is_none() {
                self.busy_started_at = Some(now);
            }
            trace!("loading gate busy");
        } else if !actual && was {
            match self.busy_started_at {
                Some(started) => {
                    let elapsed = now.saturating_duration_since(started);
                    if elapsed >= self.min_display {
                        self.visible = false;
                        self.busy_started_at = None;
                        self.hide.cancel();
                        trace!(?elapsed, "loading gate hidden at floor");
                    } else {
                        self.hide.schedule_at(started + self.min_display);
                        trace!(
                            remaining = ?(self.min_display - elapsed),
                            "loading gate hide deferred"
                        );
                    }
                }
                None => {
                    self.visible = false;
                }
            }
        }

        self.visible
    }

    /// Settle a due hide deadline and return the visible flag.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        self.settle_due(now);
        self.visible
    }

    fn settle_due(&mut self, now: Instant) {
        if self.hide.take_due(now) {
            self.visible = false;
            self.busy_started_at = None;
            trace!("loading gate hidden after floor");
        }
    }

    // ── Accessors / configuration ────────────────────────────────────

    /// The visible flag as of the last `observe`/`poll`.
    #[inline]
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// Floor duration currently in effect.
    #[inline]
    #[must_use]
    pub fn min_display(&self) -> Duration {
        self.min_display
    }

    /// Change the floor. Takes effect at the next busy→idle transition;
    /// an already-armed hide deadline keeps its original fire time.
    pub fn set_min_display(&mut self, min_display: Duration) {
        self.min_display = min_display;
    }

    /// Whether smoothing is enabled.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable smoothing. Takes effect on the next `observe`.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Default for LoadingGate {
    /// A real-clock gate with the default 800ms floor.
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DISPLAY)
    }
}

impl Coordinator for LoadingGate {
    fn tick(&mut self) {
        let _ = self.poll();
    }

    fn cancel_pending(&mut self) {
        self.hide.cancel();
        self.busy_started_at = None;
    }

    fn has_pending(&self) -> bool {
        self.hide.is_armed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use quiesce_core::LabClock;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_200: Duration = Duration::from_millis(200);
    const MS_600: Duration = Duration::from_millis(600);
    const MS_800: Duration = Duration::from_millis(800);

    fn lab_gate(floor: Duration) -> (LabClock, LoadingGate) {
        let lab = LabClock::new();
        let gate = LoadingGate::with_clock(Clock::lab(&lab), floor);
        (lab, gate)
    }

    #[test]
    fn starts_hidden() {
        let (_, gate) = lab_gate(MS_800);
        assert!(!gate.visible());
        assert!(!Coordinator::has_pending(&gate));
    }

    #[test]
    fn busy_shows_immediately() {
        let (_, mut gate) = lab_gate(MS_800);
        assert!(gate.observe(true));
        assert!(gate.visible());
    }

    #[test]
    fn slow_operation_hides_immediately() {
        // Busy 1000ms with an 800ms floor: hides on the spot.
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true);
        lab.advance(Duration::from_millis(1000));
        assert!(!gate.observe(false));
        assert!(!Coordinator::has_pending(&gate));
    }

    #[test]
    fn fast_operation_holds_until_floor() {
        // Busy 200ms with an 800ms floor: stays visible until 800ms total.
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true);
        lab.advance(MS_200);
        assert!(gate.observe(false));
        assert!(Coordinator::has_pending(&gate));

        // 799ms total: still visible.
        lab.advance(Duration::from_millis(599));
        assert!(gate.poll());

        // 800ms total: hidden.
        lab.advance(Duration::from_millis(1));
        assert!(!gate.poll());
        assert!(!Coordinator::has_pending(&gate));
    }

    #[test]
    fn observe_settles_due_hide_without_edge() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true);
        lab.advance(MS_100);
        gate.observe(false);
        lab.advance(MS_800);
        // No poll in between; a repeated observe(false) settles the hide.
        assert!(!gate.observe(false));
    }

    #[test]
    fn rebusy_before_floor_keeps_original_start() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true); // t=0
        lab.advance(MS_100);
        gate.observe(false); // hide armed for t=800
        lab.advance(MS_100);
        gate.observe(true); // t=200: re-busy, floor NOT restarted
        assert!(gate.visible());
        assert!(!Coordinator::has_pending(&gate));

        // t=900: past the original floor, so this idle edge hides at once.
        lab.advance(Duration::from_millis(700));
        assert!(!gate.observe(false));
    }

    #[test]
    fn rebusy_cancels_stale_hide() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true); // t=0
        lab.advance(MS_100);
        gate.observe(false); // hide armed for t=800
        gate.observe(true); // re-busy at t=100

        // Past the stale deadline: the loader must still be visible.
        lab.advance(MS_800);
        assert!(gate.poll());
        assert!(gate.visible());
    }

    #[test]
    fn rebusy_before_floor_then_fast_idle_hides_immediately() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true); // t=0
        lab.advance(MS_600);
        gate.observe(false); // hide armed for t=800
        lab.advance(MS_100);
        gate.observe(true); // t=700, original start governs
        lab.advance(MS_200);
        // t=900: elapsed since original start is 900ms >= 800ms.
        assert!(!gate.observe(false));
    }

    #[test]
    fn disabled_mirrors_actual() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.set_enabled(false);

        assert!(gate.observe(true));
        lab.advance(MS_100);
        // Under the floor, but disabled: hides instantly.
        assert!(!gate.observe(false));
        assert!(!Coordinator::has_pending(&gate));
    }

    #[test]
    fn disabling_clears_pending_hide() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true);
        lab.advance(MS_100);
        gate.observe(false); // hide armed
        gate.set_enabled(false);
        assert!(!gate.observe(false));
        assert!(!Coordinator::has_pending(&gate));

        // Re-enabling starts from a clean slate.
        gate.set_enabled(true);
        lab.advance(MS_800);
        assert!(gate.observe(true));
        lab.advance(MS_100);
        assert!(gate.observe(false)); // fresh floor in effect again
    }

    #[test]
    fn idle_without_busy_start_stays_hidden() {
        let (_, mut gate) = lab_gate(MS_800);
        assert!(!gate.observe(false));
        assert!(!gate.observe(false));
    }

    #[test]
    fn repeated_busy_observations_are_stable() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true);
        lab.advance(MS_100);
        assert!(gate.observe(true));
        lab.advance(MS_100);
        assert!(gate.observe(true));
        // Floor still measured from the first edge.
        lab.advance(MS_600);
        assert!(!gate.observe(false));
    }

    #[test]
    fn zero_floor_never_delays() {
        let (lab, mut gate) = lab_gate(Duration::ZERO);
        gate.observe(true);
        lab.advance(Duration::from_millis(1));
        assert!(!gate.observe(false));
    }

    #[test]
    fn second_cycle_gets_fresh_floor() {
        let (lab, mut gate) = lab_gate(MS_200);
        // First cycle, slower than the floor.
        gate.observe(true);
        lab.advance(MS_600);
        gate.observe(false);

        // Second cycle, faster than the floor.
        gate.observe(true);
        lab.advance(MS_100);
        assert!(gate.observe(false));
        lab.advance(MS_100);
        assert!(!gate.poll());
    }

    #[test]
    fn cancel_pending_suppresses_hide() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.observe(true);
        lab.advance(MS_100);
        gate.observe(false);
        assert!(Coordinator::has_pending(&gate));

        Coordinator::cancel_pending(&mut gate);
        lab.advance(MS_800);
        // The hide was cancelled; visible stays wherever it was.
        gate.tick();
        assert!(gate.visible());
        assert!(!Coordinator::has_pending(&gate));
    }

    #[test]
    fn set_min_display_applies_to_next_idle_edge() {
        let (lab, mut gate) = lab_gate(MS_800);
        gate.set_min_display(MS_200);
        assert_eq!(gate.min_display(), MS_200);

        gate.observe(true);
        lab.advance(MS_100);
        gate.observe(false);
        lab.advance(MS_100);
        // 200ms floor, 200ms elapsed: hidden.
        assert!(!gate.poll());
    }

    #[test]
    fn default_floor_constant() {
        assert_eq!(DEFAULT_MIN_DISPLAY, Duration::from_millis(800));
        let gate = LoadingGate::default();
        assert_eq!(gate.min_display(), DEFAULT_MIN_DISPLAY);
        assert!(gate.is_enabled());
        assert!(!gate.visible());
    }
}
