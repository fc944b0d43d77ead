//! In-memory response cache with TTL expiry and tag invalidation.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

use super::key::CacheKey;

/// Cached decoded payload with expiry and domain tags.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
    tags: HashSet<String>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Keyed store of decoded responses.
///
/// Every operation takes the lock for its whole duration, so a lookup can
/// never observe a half-applied invalidation.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, if present and not yet expired.
    ///
    /// Expired entries are evicted on the way out.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                tracing::debug!(key = %key, "evicted expired cache entry");
                None
            }
            None => None,
        }
    }

    /// Store `value` for `ttl`, filed under `tags`. A zero TTL stores nothing.
    ///
    /// Expired entries are swept on every insert, so keys that are never read
    /// again do not accumulate.
    pub fn set<S: AsRef<str>>(&self, key: CacheKey, value: Value, ttl: Duration, tags: &[S]) {
        if ttl.is_zero() {
            return;
        }
        let tags = tags
            .iter()
            .map(AsRef::as_ref)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        let now = Instant::now();
        let entry = CacheEntry { value, expires_at: now + ttl, tags };

        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let swept = before - entries.len();
        if swept > 0 {
            tracing::debug!(swept, "swept expired cache entries");
        }
        entries.insert(key, entry);
    }

    /// Remove every entry whose tags intersect `tags`.
    ///
    /// Returns the number of evicted entries. An empty tag list purges nothing.
    pub fn invalidate_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let wanted: HashSet<&str> = tags.iter().map(AsRef::as_ref).filter(|t| !t.is_empty()).collect();
        if wanted.is_empty() {
            return 0;
        }

        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.tags.iter().any(|t| wanted.contains(t.as_str())));
        let evicted = before - entries.len();

        tracing::debug!(?wanted, evicted, "invalidated cache by tags");
        evicted
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "cleared response cache");
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
