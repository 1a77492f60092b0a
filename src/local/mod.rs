//! Offline persistence
//!
//! - **cache**: SQLite key-value cache with a byte quota
//! - **mirror**: keeps the cache in step with the store while signed out

pub mod cache;
pub mod mirror;

pub use cache::{CacheError, CacheKey, CacheResult, LocalCache, CACHE_FILE, DEFAULT_QUOTA_BYTES};
pub use mirror::{hydrate, persist, persist_all, LocalMirror};
