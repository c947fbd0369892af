#![forbid(unsafe_code)]

//! Keyed response cache with stale-marking prefix invalidation.
//!
//! [`ResponseCache`] maps [`CacheKey`]s to cached values. Invalidation does
//! not remove entries; it marks them stale, so callers may still serve a
//! stale value while a refetch is in flight ([`get_any`]) or drop stale
//! entries wholesale ([`purge_stale`]). A monotonic revision counter is
//! bumped on every mutation, which gives consumers a cheap "did anything
//! change since I last looked" probe.
//!
//! [`SharedCache`] is the single-threaded shared handle (`Rc<RefCell<..>>`)
//! UI elements clone into coordinators, and implements [`Invalidate`] — the
//! seam through which the runtime crate talks to any cache.
//!
//! # Invariants
//!
//! 1. Invalidation is idempotent: a second sweep over the same prefix is a
//!    no-op and does not bump the revision.
//! 2. `get` returns only fresh entries; `get_any` returns fresh or stale.
//! 3. Inserting over any existing entry (fresh or stale) makes it fresh.
//! 4. The revision counter is strictly monotonic across mutations.
//!
//! [`get_any`]: ResponseCache::get_any
//! [`purge_stale`]: ResponseCache::purge_stale

use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;
use tracing::debug;

use crate::key::CacheKey;

// ─── Invalidate seam ─────────────────────────────────────────────────────────

/// Prefix invalidation, as seen by coordinators.
///
/// `prefix` selects entries whose key starts with the given segments;
/// `exact` restricts the sweep to the exact key. Returns how many entries
/// were newly marked stale. Invalidating an absent or already-stale key is
/// a no-op.
pub trait Invalidate {
    fn invalidate(&self, prefix: &CacheKey, exact: bool) -> usize;
}

// ─── ResponseCache ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stale: bool,
    revision: u64,
}

/// Owned keyed response cache.
#[derive(Debug)]
pub struct ResponseCache<V> {
    entries: AHashMap<CacheKey, Entry<V>>,
    revision: u64,
}

impl<V> ResponseCache<V> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
            revision: 0,
        }
    }

    /// Insert or replace a value. The entry becomes fresh either way.
    pub fn insert(&mut self, key: CacheKey, value: V) {
        self.revision += 1;
        let revision = self.revision;
        self.entries.insert(
            key,
            Entry {
                value,
                stale: false,
                revision,
            },
        );
    }

    /// Get a fresh value. Stale entries are treated as misses.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|e| !e.stale)
            .map(|e| &e.value)
    }

    /// Get a value whether fresh or stale, with its staleness flag.
    #[must_use]
    pub fn get_any(&self, key: &CacheKey) -> Option<(&V, bool)> {
        self.entries.get(key).map(|e| (&e.value, e.stale))
    }

    /// Whether the entry exists and is stale. Absent entries return `None`.
    #[must_use]
    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.entries.get(key).map(|e| e.stale)
    }

    /// Whether an entry exists at all (fresh or stale).
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Total entry count, fresh and stale.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fresh entries.
    #[must_use]
    pub fn fresh_len(&self) -> usize {
        self.entries.values().filter(|e| !e.stale).count()
    }

    /// Number of stale entries.
    #[must_use]
    pub fn stale_len(&self) -> usize {
        self.entries.values().filter(|e| e.stale).count()
    }

    /// Remove an entry, returning its value.
    pub fn remove(&mut self, key: &CacheKey) -> Option<V> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.revision += 1;
        }
        removed.map(|e| e.value)
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.revision += 1;
        }
        self.entries.clear();
    }

    /// Drop all stale entries. Returns how many were removed.
    pub fn purge_stale(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, e| !e.stale);
        let removed = before - self.entries.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Mark matching entries stale.
    ///
    /// With `exact` false, every entry whose key starts with `prefix` is
    /// swept; with `exact` true, only the entry at exactly `prefix`.
    /// Returns the number of entries newly marked. Sweeping entries that
    /// are already stale (or absent) changes nothing.
    pub fn invalidate(&mut self, prefix: &CacheKey, exact: bool) -> usize {
        let mut marked = 0;
        for (key, entry) in &mut self.entries {
            if entry.stale {
                continue;
            }
            let hit = if exact {
                key == prefix
            } else {
                key.starts_with(prefix)
            };
            if hit {
                entry.stale = true;
                marked += 1;
            }
        }
        if marked > 0 {
            self.revision += 1;
            debug!(prefix = %prefix, exact, marked, "cache invalidation sweep");
        }
        marked
    }

    /// Monotonic revision counter, bumped on every mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Revision at which an entry was last inserted.
    #[must_use]
    pub fn inserted_at(&self, key: &CacheKey) -> Option<u64> {
        self.entries.get(key).map(|e| e.revision)
    }

    /// Iterator over keys, fresh and stale.
    pub fn keys(&self) -> impl Iterator<Item = &CacheKey> {
        self.entries.keys()
    }
}

impl<V> Default for ResponseCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

// ─── SharedCache ─────────────────────────────────────────────────────────────

/// Cloneable single-threaded handle to a [`ResponseCache`].
///
/// All clones point at the same underlying cache. Values are cloned out on
/// read; interior mutability is `RefCell`, so re-entrant access from inside
/// a borrow panics.
pub struct SharedCache<V> {
    inner: Rc<RefCell<ResponseCache<V>>>,
}

impl<V> Clone for SharedCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> std::fmt::Debug for SharedCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SharedCache")
            .field("len", &inner.len())
            .field("stale", &inner.stale_len())
            .field("revision", &inner.revision())
            .finish()
    }
}

impl<V> SharedCache<V> {
    /// Create a handle to a fresh empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ResponseCache::new())),
        }
    }

    /// Insert or replace a value.
    pub fn insert(&self, key: CacheKey, value: V) {
        self.inner.borrow_mut().insert(key, value);
    }

    /// Whether the entry exists and is stale. Absent entries return `None`.
    #[must_use]
    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.inner.borrow().is_stale(key)
    }

    /// Whether an entry exists at all.
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.borrow().contains(key)
    }

    /// Total entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    /// Number of stale entries.
    #[must_use]
    pub fn stale_len(&self) -> usize {
        self.inner.borrow().stale_len()
    }

    /// Drop all stale entries. Returns how many were removed.
    pub fn purge_stale(&self) -> usize {
        self.inner.borrow_mut().purge_stale()
    }

    /// Monotonic revision counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.borrow().revision()
    }

    /// Run a closure with read access to the underlying cache.
    pub fn with<R>(&self, f: impl FnOnce(&ResponseCache<V>) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run a closure with write access to the underlying cache.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut ResponseCache<V>) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }
}

impl<V: Clone> SharedCache<V> {
    /// Get a clone of a fresh value. Stale entries are misses.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.inner.borrow().get(key).cloned()
    }

    /// Get a clone of a value whether fresh or stale, with its staleness.
    #[must_use]
    pub fn get_any(&self, key: &CacheKey) -> Option<(V, bool)> {
        self.inner
            .borrow()
            .get_any(key)
            .map(|(v, stale)| (v.clone(), stale))
    }
}

impl<V> Default for SharedCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Invalidate for SharedCache<V> {
    fn invalidate(&self, prefix: &CacheKey, exact: bool) -> usize {
        self.inner.borrow_mut().invalidate(prefix, exact)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
