//! Process-local response cache.
//!
//! Entries are decoded JSON payloads keyed by request fingerprint. They
//! leave the cache in three ways:
//!
//! - TTL expiry, checked lazily on lookup
//! - Tag invalidation after a mutation on an overlapping route
//! - A full clear whenever the stored credential changes

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::ResponseCache;
