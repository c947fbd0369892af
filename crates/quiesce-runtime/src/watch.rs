#![forbid(unsafe_code)]

//! Change-driven refetch coalescing.
//!
//! A [`RefetchWatch`] observes a selector value (active tab, filter, page)
//! and converts changes into a single delayed action: invalidate the
//! configured cache-key prefix, then invoke the refetch callback. The very
//! first observed value only primes the watch — mounting never fires. Rapid
//! changes coalesce: each detected change supersedes the pending settle
//! deadline, so only the last change in a burst triggers the action,
//! `settle_delay` after it was observed (trailing-edge debounce).
//!
//! The comparison baseline (`previous`) is updated when a change is
//! *detected*, not when the deferred action fires. Consequence: a burst
//! that returns to its starting value (A→B→A inside one settle window)
//! still fires once, because each step was a real observed change. See
//! DESIGN.md for the rationale behind this policy.
//!
//! # Invariants
//!
//! 1. The first observed value never triggers invalidation or refetch.
//! 2. Observing a value equal to the previous one is a no-op.
//! 3. At most one settle deadline is outstanding; a detected change
//!    replaces it.
//! 4. On fire, invalidation (if configured and a cache is attached) runs
//!    before the refetch callback.
//! 5. Dropping the watch cancels the pending action; nothing fires after
//!    teardown.
//!
//! # Failure Modes
//!
//! The watch itself cannot fail. A panic in the refetch callback (or the
//! cache's invalidation path) unwinds through [`poll`](RefetchWatch::poll)
//! to the event loop untouched — the watch neither catches nor retries,
//! and its own state stays consistent (the deadline was already consumed).

use std::rc::Rc;

use quiesce_cache::{CacheKey, Invalidate};
use quiesce_core::{Clock, Deferred};
use tracing::{debug, trace};
use web_time::Duration;

use crate::registry::Coordinator;

/// Default settle delay for plain watches.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Settle delay for tab/selector switches, which arrive on slower human
/// cadence than pagination clicks.
pub const TAB_SETTLE_DELAY: Duration = Duration::from_millis(100);

// ─── WatchConfig ─────────────────────────────────────────────────────────────

/// Configuration for a [`RefetchWatch`].
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Key prefix swept on fire.
    pub cache_key: CacheKey,
    /// Coalescing window after the last detected change.
    pub settle_delay: Duration,
    /// Whether the fire includes a cache sweep.
    pub invalidate_on_change: bool,
}

impl WatchConfig {
    /// A plain watch over `cache_key` with default delay and invalidation.
    #[must_use]
    pub fn new(cache_key: CacheKey) -> Self {
        Self {
            cache_key,
            settle_delay: DEFAULT_SETTLE_DELAY,
            invalidate_on_change: true,
        }
    }

    /// Preset for selector-tab changes: base segment plus an optional
    /// identifier, 100ms settle, invalidation on.
    #[must_use]
    pub fn tab_switch(base: &str, id: Option<&str>) -> Self {
        Self {
            cache_key: CacheKey::from_optional([Some(base), id]),
            settle_delay: TAB_SETTLE_DELAY,
            invalidate_on_change: true,
        }
    }

    /// Preset for pagination changes: single segment, 50ms settle, refetch
    /// callback only (the page's cache entries stay valid).
    #[must_use]
    pub fn pagination(segment: &str) -> Self {
        Self {
            cache_key: CacheKey::from(segment),
            settle_delay: DEFAULT_SETTLE_DELAY,
            invalidate_on_change: false,
        }
    }

    /// Override the settle delay (builder form).
    #[must_use]
    pub fn settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Override whether the fire sweeps the cache (builder form).
    #[must_use]
    pub fn invalidate_on_change(mut self, invalidate: bool) -> Self {
        self.invalidate_on_change = invalidate;
        self
    }
}

// ─── RefetchWatch ────────────────────────────────────────────────────────────

/// Watches one selector value and coalesces its changes into delayed
/// invalidate-and-refetch actions.
pub struct RefetchWatch<T> {
    clock: Clock,
    config: WatchConfig,
    /// `None` until the first evaluation primes the watch.
    previous: Option<T>,
    settle: Deferred,
    cache: Option<Rc<dyn Invalidate>>,
    refetch: Option<Box<dyn FnMut()>>,
}

impl<T: std::fmt::Debug> std::fmt::Debug for RefetchWatch<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefetchWatch")
            .field("previous", &self.previous)
            .field("pending", &self.settle.is_armed())
            .field("cache_key", &self.config.cache_key)
            .finish()
    }
}

impl<T: PartialEq> RefetchWatch<T> {
    /// Create a watch with the given config, backed by the real clock.
    #[must_use]
    pub fn new(config: WatchConfig) -> Self {
        Self::with_clock(Clock::real(), config)
    }

    /// Create a watch with an explicit clock (lab clocks for tests).
    #[must_use]
    pub fn with_clock(clock: Clock, config: WatchConfig) -> Self {
        Self {
            clock,
            config,
            previous: None,
            settle: Deferred::idle(),
            cache: None,
            refetch: None,
        }
    }

    /// Attach the cache handle swept on fire (builder form).
    #[must_use]
    pub fn with_cache(mut self, cache: Rc<dyn Invalidate>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Attach the refetch callback invoked on fire (builder form).
    #[must_use]
    pub fn on_refetch(mut self, refetch: impl FnMut() + 'static) -> Self {
        self.refetch = Some(Box::new(refetch));
        self
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Feed the current selector value.
    ///
    /// The first call primes the baseline without side effects. Later
    /// calls compare against the baseline: equality is a no-op, a change
    /// updates the baseline immediately and (re)arms the settle deadline.
    pub fn observe(&mut self, value: T) {
        match &self.previous {
            None => {
                // First evaluation: prime, never fire.
                self.previous = Some(value);
            }
            Some(prev) if *prev == value => {}
            Some(_) => {
                self.previous = Some(value);
                let now = self.clock.now();
                self.settle.schedule_after(now, self.config.settle_delay);
                trace!(
                    cache_key = %self.config.cache_key,
                    delay = ?self.config.settle_delay,
                    "refetch watch change detected"
                );
            }
        }
    }

    /// Fire the pending action if its settle window has elapsed.
    ///
    /// Returns `true` when the action fired. Invalidation runs before the
    /// refetch callback; errors from either propagate to the caller.
    pub fn poll(&mut self) -> bool {
        let now = self.clock.now();
        if !self.settle.take_due(now) {
            return false;
        }
        if self.config.invalidate_on_change {
            if let Some(cache) = &self.cache {
                let marked = cache.invalidate(&self.config.cache_key, false);
                debug!(
                    cache_key = %self.config.cache_key,
                    marked,
                    "refetch watch invalidated prefix"
                );
            }
        }
        if let Some(refetch) = &mut self.refetch {
            refetch();
        }
        true
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The baseline value, once primed.
    #[must_use]
    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }

    /// Whether the watch has seen its first value.
    #[must_use]
    pub fn is_primed(&self) -> bool {
        self.previous.is_some()
    }

    /// The configuration in effect.
    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }
}

impl<T: PartialEq> Coordinator for RefetchWatch<T> {
    fn tick(&mut self) {
        let _ = self.poll();
    }

    fn cancel_pending(&mut self) {
        self.settle.cancel();
    }

    fn has_pending(&self) -> bool {
        self.settle.is_armed()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
