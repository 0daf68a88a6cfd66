//! Generic caching layer for server data.
//!
//! This module provides a service-agnostic caching mechanism that:
//! - Caches reads under a stable key, serialized as JSON
//! - Shares one network request between identical concurrent reads
//! - Associates reads with tags and marks them stale when a tag is invalidated
//! - Broadcasts invalidations so long-lived consumers can re-fetch

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{MemoryStorage, NoopStorage};
pub use traits::{CacheResult, Cacheable, Invalidation, QueryKey, Tag};
