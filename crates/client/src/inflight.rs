//! In-flight registry collapsing concurrent identical reads.
//!
//! A registered transfer runs on its own task and is shared through a
//! future every caller can await. The task owns the registry entry: it is
//! removed when the transfer settles, fails, panics or is aborted, whether
//! or not anyone is still waiting on it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::Value;
use shiftdesk_core::CacheKey;

use crate::error::ApiError;

/// Result every waiter on a transfer receives.
pub type TransferResult = Result<Value, ApiError>;

/// Pending transfer that any number of callers may await.
pub type PendingResult = Shared<BoxFuture<'static, TransferResult>>;

type Entries = Arc<Mutex<HashMap<CacheKey, Entry>>>;

#[derive(Clone)]
struct Entry {
    id: u64,
    pending: PendingResult,
}

/// Keyed map from request fingerprint to pending result.
#[derive(Default)]
pub struct InFlightRegistry {
    entries: Entries,
    next_id: AtomicU64,
}

impl std::fmt::Debug for InFlightRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlightRegistry").field("len", &self.len()).finish()
    }
}

/// Removes its entry on drop, unless a newer transfer replaced it.
struct EntryGuard {
    entries: Entries,
    key: CacheKey,
    id: u64,
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        let mut entries = self.entries.lock();
        if entries.get(&self.key).is_some_and(|e| e.id == self.id) {
            entries.remove(&self.key);
        }
    }
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending result for `key`, if a transfer is in flight.
    pub fn get(&self, key: &CacheKey) -> Option<PendingResult> {
        self.entries.lock().get(key).map(|e| e.pending.clone())
    }

    /// Start `transfer` under `key` and return its shared handle.
    ///
    /// Replaces any entry already present for `key`. Must be called within a
    /// tokio runtime.
    pub fn register(&self, key: CacheKey, transfer: BoxFuture<'static, TransferResult>) -> PendingResult {
        let mut entries = self.entries.lock();
        let entry = self.spawn(key.clone(), transfer);
        entries.insert(key, entry.clone());
        entry.pending
    }

    /// Join the transfer in flight for `key`, or start one built by `start`.
    ///
    /// Lookup and insert happen under one lock, so two callers racing on the
    /// same key always end up sharing a single transfer. The boolean is
    /// `true` when an existing transfer was joined.
    pub fn join_or_register<F>(&self, key: CacheKey, start: F) -> (PendingResult, bool)
    where
        F: FnOnce() -> BoxFuture<'static, TransferResult>,
    {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get(&key) {
            return (existing.pending.clone(), true);
        }
        let entry = self.spawn(key.clone(), start());
        entries.insert(key, entry.clone());
        (entry.pending, false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Detach `transfer` onto a task so dropping every waiter cannot stall it.
    fn spawn(&self, key: CacheKey, transfer: BoxFuture<'static, TransferResult>) -> Entry {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (method, url) = (key.method().to_string(), key.url().to_string());
        let guard = EntryGuard { entries: Arc::clone(&self.entries), key, id };

        let task = tokio::spawn(async move {
            let _guard = guard;
            transfer.await
        });

        let pending = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(%url, error = %e, "in-flight transfer aborted");
                    Err(ApiError::network(&method, &url, format!("transfer aborted: {e}")))
                }
            }
        }
        .boxed()
        .shared();

        Entry { id, pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn key(path: &str) -> CacheKey {
        CacheKey::new("GET", &format!("https://api.example.com{path}"), "")
    }

    #[tokio::test]
    async fn test_register_removes_entry_on_success() {
        let registry = InFlightRegistry::new();
        let pending = registry.register(key("/a"), async { Ok(json!(1)) }.boxed());
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&key("/a")).is_some());

        assert_eq!(pending.await, Ok(json!(1)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_register_removes_entry_on_failure() {
        let registry = InFlightRegistry::new();
        let pending = registry.register(key("/a"), async { Err(ApiError::network("GET", "/a", "down")) }.boxed());

        assert!(pending.await.unwrap_err().is_network());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_join_shares_one_transfer() {
        let registry = InFlightRegistry::new();
        let starts = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<Value>();

        let counter = Arc::clone(&starts);
        let (first, joined_first) = registry.join_or_register(key("/a"), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(rx.await.unwrap_or(Value::Null)) }.boxed()
        });
        let counter = Arc::clone(&starts);
        let (second, joined_second) = registry.join_or_register(key("/a"), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(json!("never")) }.boxed()
        });

        assert!(!joined_first);
        assert!(joined_second);
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        tx.send(json!({"shared": true})).unwrap();
        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, Ok(json!({"shared": true})));
        assert_eq!(a, b);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_share() {
        let registry = InFlightRegistry::new();
        let (_, joined_a) = registry.join_or_register(key("/a"), || async { Ok(json!("a")) }.boxed());
        let (_, joined_b) = registry.join_or_register(key("/b"), || async { Ok(json!("b")) }.boxed());
        assert!(!joined_a);
        assert!(!joined_b);
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_transfer_outlives_dropped_waiters() {
        let registry = InFlightRegistry::new();
        let finished = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<()>();

        let counter = Arc::clone(&finished);
        let (pending, _) = registry.join_or_register(key("/a"), move || {
            async move {
                let _ = rx.await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!(1))
            }
            .boxed()
        });
        drop(pending);
        assert_eq!(registry.len(), 1);

        tx.send(()).unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_panicked_transfer_is_removed_and_reported() {
        let registry = InFlightRegistry::new();
        async fn explode() -> TransferResult {
            panic!("boom")
        }

        let (pending, _) = registry.join_or_register(key("/a"), || explode().boxed());

        let err = pending.await.unwrap_err();
        assert!(err.is_network());
        assert!(err.message.contains("transfer aborted"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_replaced_entry_survives_old_transfer() {
        let registry = InFlightRegistry::new();
        let first = registry.register(key("/a"), async { Ok(json!(1)) }.boxed());
        let (tx, rx) = oneshot::channel::<Value>();
        let _second = registry.register(key("/a"), async move { Ok(rx.await.unwrap_or(Value::Null)) }.boxed());

        assert_eq!(first.await, Ok(json!(1)));
        assert_eq!(registry.len(), 1);

        tx.send(json!(2)).unwrap();
        assert_eq!(registry.get(&key("/a")).unwrap().await, Ok(json!(2)));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_new_transfer_after_settle() {
        let registry = InFlightRegistry::new();
        let (first, _) = registry.join_or_register(key("/a"), || async { Ok(json!(1)) }.boxed());
        assert_eq!(first.await, Ok(json!(1)));

        let (second, joined) = registry.join_or_register(key("/a"), || async { Ok(json!(2)) }.boxed());
        assert!(!joined);
        assert_eq!(second.await, Ok(json!(2)));
    }
}
