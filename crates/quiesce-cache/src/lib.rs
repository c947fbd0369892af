#![forbid(unsafe_code)]

//! Cache: ordered-segment keys, prefix matching, and the keyed response
//! cache the runtime coordinators invalidate into.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{Invalidate, ResponseCache, SharedCache};
