//! In-process TTL store backend.
//!
//! Single-instance deployments run without Redis; counters and revocation
//! markers live in a mutex-guarded map with per-key deadlines.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Entry {
    count: i64,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d <= now)
    }
}

/// Mutex-guarded key/value map with per-key expiry deadlines.
///
/// Every operation takes the lock once, so increment-and-window bookkeeping
/// is atomic with respect to concurrent callers on the same key.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Increment the counter for `key`, returning the post-increment value.
    /// A lapsed deadline resets the counter before incrementing.
    pub fn increment(&self, key: &str) -> i64 {
        let mut entries = self.entries.lock();
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(Entry {
            count: 0,
            deadline: None,
        });
        if entry.is_expired(now) {
            entry.count = 0;
            entry.deadline = None;
        }
        entry.count += 1;
        entry.count
    }

    /// Set the expiry deadline for an existing key. Missing keys are ignored.
    pub fn expire(&self, key: &str, ttl: Duration) {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        if let Some(entry) = entries.get_mut(key) {
            if !entry.is_expired(now) {
                entry.deadline = Some(now + ttl);
            }
        }
    }

    /// Remaining lifetime of `key`, if present and not expired.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.entries.lock();
        let now = Instant::now();
        let entry = entries.get(key)?;
        if entry.is_expired(now) {
            return None;
        }
        entry.deadline.map(|d| d - now)
    }

    /// Insert a marker that disappears after `ttl`. Overwrites any previous
    /// entry for the key.
    pub fn set_ex(&self, key: &str, ttl: Duration) {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        entries.insert(
            key.to_string(),
            Entry {
                count: 1,
                deadline: Some(now + ttl),
            },
        );
    }

    /// Point-in-time membership check.
    pub fn exists(&self, key: &str) -> bool {
        let entries = self.entries.lock();
        let now = Instant::now();
        entries.get(key).is_some_and(|e| !e.is_expired(now))
    }

    /// Drop expired entries (call from a background task).
    pub fn cleanup(&self) {
        let mut entries = self.entries.lock();
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
