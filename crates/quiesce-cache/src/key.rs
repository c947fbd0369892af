#![forbid(unsafe_code)]

//! Ordered-segment cache keys with prefix matching.
//!
//! A [`CacheKey`] identifies a cached response as an ordered sequence of
//! string segments, e.g. `reviews/acme/open`. Invalidation uses prefix
//! semantics: the key `reviews/acme` covers every entry whose key starts
//! with those two segments. Keys are built either from definite segments or
//! from optional ones via [`from_optional`](CacheKey::from_optional), which
//! drops absent segments so call sites can pass an optional identifier
//! straight through.
//!
//! # Invariants
//!
//! 1. The empty key ([`root`](CacheKey::root)) is a prefix of every key,
//!    including itself.
//! 2. Every key is a prefix of itself (`starts_with` is reflexive).
//! 3. `starts_with` is segment-wise: `ab` is not a prefix of `abc/d` unless
//!    segments match exactly, position by position.
//! 4. `from_optional` preserves the relative order of present segments.

use std::fmt;

/// An ordered sequence of string segments identifying a cached response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CacheKey {
    segments: Vec<String>,
}

impl CacheKey {
    /// Build a key from definite segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a key from optional segments, dropping the absent ones.
    ///
    /// `[Some("reviews"), None, Some("open")]` yields `reviews/open`.
    #[must_use]
    pub fn from_optional<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().flatten().map(Into::into).collect(),
        }
    }

    /// The empty key — a prefix of every key.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Append a segment (builder form).
    #[must_use]
    pub fn child(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append a segment in place.
    pub fn push(&mut self, segment: impl Into<String>) {
        self.segments.push(segment.into());
    }

    /// The segments in order.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root (empty) key.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether this key begins with every segment of `prefix`, in order.
    #[must_use]
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self
                .segments
                .iter()
                .zip(prefix.segments.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl FromIterator<String> for CacheKey {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl From<&str> for CacheKey {
    fn from(segment: &str) -> Self {
        Self::new([segment])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
