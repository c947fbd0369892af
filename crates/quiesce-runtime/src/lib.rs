#![forbid(unsafe_code)]

//! Runtime: the loading-floor gate, the change-driven refetch watch, and
//! the explicitly-owned registry that polls them.

pub mod loading;
pub mod registry;
pub mod watch;

pub use loading::LoadingGate;
pub use registry::{Coordinator, CoordinatorRegistry, RegistryError};
pub use watch::{RefetchWatch, WatchConfig};
