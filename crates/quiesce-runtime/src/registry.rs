#![forbid(unsafe_code)]

//! Explicitly-owned poll registry for coordinators.
//!
//! UI elements own their coordinators (`Rc<RefCell<..>>`); the registry
//! keeps labeled *weak* registrations and drives every live member's timer
//! on [`poll_all`](CoordinatorRegistry::poll_all). Registrations whose
//! owner has been dropped fail to upgrade and are pruned lazily during the
//! poll, so a torn-down coordinator is never ticked again.
//!
//! The registry is an ordinary value with an `init`/`dispose` lifecycle:
//! construct it where the event loop lives, pass it down explicitly, and
//! [`dispose`](CoordinatorRegistry::dispose) it on shutdown. There is no
//! process-wide singleton; two registries coexist without interference.
//!
//! # Invariants
//!
//! 1. Labels are unique; registering an existing label replaces it.
//! 2. A dropped owner is never polled (upgrade fails, entry pruned).
//! 3. `dispose` cancels every live member's pending action, empties the
//!    registry, and makes further registration fail; it is idempotent.
//! 4. Registration order is poll order.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use thiserror::Error;
use tracing::trace;

/// A pollable timer owner: both runtime coordinators implement this.
pub trait Coordinator {
    /// Advance: settle any due deadline and apply its effects.
    fn tick(&mut self);

    /// Cancel any pending deferred action without firing it.
    fn cancel_pending(&mut self);

    /// Whether a deferred action is currently outstanding.
    fn has_pending(&self) -> bool;
}

/// Registry lifecycle errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The registry was disposed; it accepts no further registrations.
    #[error("coordinator registry has been disposed")]
    Disposed,
}

struct Member {
    label: String,
    handle: Weak<RefCell<dyn Coordinator>>,
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("label", &self.label)
            .field("alive", &(self.handle.strong_count() > 0))
            .finish()
    }
}

/// Labeled collection of weakly-held coordinators with a dispose lifecycle.
#[derive(Debug, Default)]
pub struct CoordinatorRegistry {
    members: Vec<Member>,
    disposed: bool,
}

impl CoordinatorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
            disposed: false,
        }
    }

    /// Register a coordinator under a label.
    ///
    /// The registry holds only a weak reference; ownership stays with the
    /// caller. An existing label is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Disposed`] after `dispose()`.
    pub fn register(
        &mut self,
        label: &str,
        handle: &Rc<RefCell<dyn Coordinator>>,
    ) -> Result<(), RegistryError> {
        if self.disposed {
            return Err(RegistryError::Disposed);
        }
        let weak = Rc::downgrade(handle);
        if let Some(existing) = self.members.iter_mut().find(|m| m.label == label) {
            existing.handle = weak;
        } else {
            self.members.push(Member {
                label: label.to_string(),
                handle: weak,
            });
        }
        Ok(())
    }

    /// Remove a registration. Returns `true` if the label was present.
    pub fn remove(&mut self, label: &str) -> bool {
        let len_before = self.members.len();
        self.members.retain(|m| m.label != label);
        self.members.len() < len_before
    }

    /// Tick every live member in registration order; prune dead entries.
    ///
    /// Returns the number of members actually polled.
    pub fn poll_all(&mut self) -> usize {
        if self.disposed {
            return 0;
        }
        let mut polled = 0;
        self.members.retain(|member| match member.handle.upgrade() {
            Some(strong) => {
                strong.borrow_mut().tick();
                polled += 1;
                true
            }
            None => {
                trace!(label = %member.label, "pruning dead registration");
                false
            }
        });
        polled
    }

    /// Cancel every live member's pending action without firing.
    pub fn cancel_all(&mut self) {
        for member in &self.members {
            if let Some(strong) = member.handle.upgrade() {
                strong.borrow_mut().cancel_pending();
            }
        }
    }

    /// Cancel everything, clear the registry, and refuse further
    /// registrations. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.cancel_all();
        self.members.clear();
        self.disposed = true;
        trace!("coordinator registry disposed");
    }

    /// Whether `dispose()` has run.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of registrations, including dead ones not yet pruned.
    ///
    /// Dead entries are cleaned lazily during [`poll_all`].
    ///
    /// [`poll_all`]: CoordinatorRegistry::poll_all
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the registry holds no registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Labels of current registrations.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.label.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
