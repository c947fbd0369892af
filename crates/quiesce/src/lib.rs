#![forbid(unsafe_code)]

//! Quiesce public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub use quiesce_cache::{CacheKey, Invalidate, ResponseCache, SharedCache};
pub use quiesce_core::{Clock, Deferred, LabClock};
pub use quiesce_runtime::{
    Coordinator, CoordinatorRegistry, LoadingGate, RefetchWatch, RegistryError, WatchConfig,
};

pub mod prelude {
    pub use quiesce_cache as cache;
    pub use quiesce_core as core;
    pub use quiesce_runtime as runtime;
}
