//! Network activity signal for loading indicators.
//!
//! Counts transfers between "started" and "settled" and publishes the count
//! on a watch channel. Purely observational: nothing in the executor reads it.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

/// Snapshot of in-flight transfer activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub pending_count: usize,
    /// `true` iff `pending_count > 0`.
    pub busy: bool,
}

impl Activity {
    fn from_count(pending_count: usize) -> Self {
        Self { pending_count, busy: pending_count > 0 }
    }
}

/// Publishes [`Activity`] whenever the in-flight count changes.
#[derive(Debug)]
pub struct ActivityBroadcaster {
    count: Mutex<usize>,
    tx: watch::Sender<Activity>,
}

impl Default for ActivityBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityBroadcaster {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Activity::default());
        Self { count: Mutex::new(0), tx }
    }

    /// Subscribe to activity changes. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<Activity> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Activity {
        Activity::from_count(*self.count.lock())
    }

    pub fn increment(&self) {
        let mut count = self.count.lock();
        *count += 1;
        self.publish(*count);
    }

    /// Decrement, saturating at zero.
    pub fn decrement(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        self.publish(*count);
    }

    /// Count one transfer until the returned guard drops.
    pub fn track(&self) -> ActivityGuard<'_> {
        self.increment();
        ActivityGuard { broadcaster: self }
    }

    fn publish(&self, count: usize) {
        // No receivers is fine; send_replace never fails.
        self.tx.send_replace(Activity::from_count(count));
    }
}

/// Decrements the in-flight count on drop, including when a transfer is
/// cancelled mid-flight.
#[derive(Debug)]
pub struct ActivityGuard<'a> {
    broadcaster: &'a ActivityBroadcaster,
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.broadcaster.decrement();
    }
}
