//! Keyed store with expiry, for a messaging front end that remembers which
//! voice message a user picked until they choose an effect.

use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

/// How long an entry stays usable unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

struct Entry<V> {
    stored_at: Instant,
    value: V,
}

/// Concurrent map whose entries expire a fixed time after being stored.
///
/// Expired entries are invisible to [`SessionStore::get_if_fresh`] and are
/// dropped by [`SessionStore::evict_expired`]. Shareable between threads
/// behind an `Arc`.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use voxshift::session::SessionStore;
///
/// let store = SessionStore::new(Duration::from_secs(60));
/// store.put(42_u64, "voice-message-id".to_string());
/// assert_eq!(store.get_if_fresh(&42), Some("voice-message-id".to_string()));
/// assert_eq!(store.get_if_fresh(&7), None);
/// ```
pub struct SessionStore<K, V> {
    ttl: Duration,
    entries: DashMap<K, Entry<V>>,
}

impl<K: Eq + Hash, V: Clone> SessionStore<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stores `value` under `key`, replacing any previous entry and
    /// restarting its lifetime.
    pub fn put(&self, key: K, value: V) {
        self.put_at(key, value, Instant::now());
    }

    /// The value under `key` if it has not expired.
    pub fn get_if_fresh(&self, key: &K) -> Option<V> {
        self.get_if_fresh_at(key, Instant::now())
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.evict_expired_at(Instant::now())
    }

    /// Removes and returns the value under `key`, fresh or not.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn put_at(&self, key: K, value: V, now: Instant) {
        self.entries.insert(
            key,
            Entry {
                stored_at: now,
                value,
            },
        );
    }

    fn get_if_fresh_at(&self, key: &K, now: Instant) -> Option<V> {
        let entry = self.entries.get(key)?;
        (now.saturating_duration_since(entry.stored_at) < self.ttl).then(|| entry.value.clone())
    }

    fn evict_expired_at(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!(evicted, "expired sessions evicted");
        }
        evicted
    }
}

impl<K: Eq + Hash, V: Clone> Default for SessionStore<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
