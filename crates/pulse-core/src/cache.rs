//! Injectable key/value cache with per-entry TTL.
//!
//! Callers hold an `Arc<dyn Cache<V>>` handed to them at construction time;
//! there is no process-global cache. [`MemoryCache`] is the in-process
//! implementation used by the server's dashboard endpoint.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A key/value cache whose entries expire after a caller-chosen TTL.
///
/// Every [`invalidate`](Cache::invalidate) or [`clear`](Cache::clear) bumps a
/// generation counter. A reader that loads from the backing store can take
/// the generation first and store with [`put_if_current`](Cache::put_if_current),
/// so a value read before an invalidation is never cached after it.
pub trait Cache<V>: Send + Sync {
    /// Return the value for `key` if present and not expired.
    fn get(&self, key: &str) -> Option<V>;
    /// Insert or replace `key`, expiring after `ttl`.
    fn put(&self, key: &str, value: V, ttl: Duration);
    /// Current generation.
    fn generation(&self) -> u64;
    /// Like [`put`](Cache::put), but only while the generation still equals
    /// `generation`. Returns whether the value was stored.
    fn put_if_current(&self, key: &str, value: V, ttl: Duration, generation: u64) -> bool;
    /// Drop a single entry.
    fn invalidate(&self, key: &str);
    /// Drop every entry.
    fn clear(&self);
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    generation: u64,
}

/// In-memory [`Cache`] guarded by a mutex. Expired entries are evicted on read.
pub struct MemoryCache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V> MemoryCache<V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                generation: 0,
            }),
        }
    }

    /// Number of stored entries, including ones that have expired but not yet been read.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + Send> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock();
        match inner.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                let _ = inner.entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        let _ = self
            .inner
            .lock()
            .entries
            .insert(key.to_string(), Entry { value, expires_at });
    }

    fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    fn put_if_current(&self, key: &str, value: V, ttl: Duration, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        let expires_at = Instant::now() + ttl;
        let _ = inner
            .entries
            .insert(key.to_string(), Entry { value, expires_at });
        true
    }

    fn invalidate(&self, key: &str) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let _ = inner.entries.remove(key);
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.entries.clear();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn get_missing_returns_none() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        assert!(cache.get("nope").is_none());
    }

    #[test]
    fn put_then_get() {
        let cache = MemoryCache::new();
        cache.put("k", 7u32, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(7));
    }

    #[test]
    fn put_replaces_existing() {
        let cache = MemoryCache::new();
        cache.put("k", 1u32, Duration::from_secs(60));
        cache.put("k", 2u32, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_expires_immediately_and_is_evicted() {
        let cache = MemoryCache::new();
        cache.put("k", 1u32, Duration::ZERO);
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = MemoryCache::new();
        cache.put("a", 1u32, Duration::from_secs(60));
        cache.put("b", 2u32, Duration::from_secs(60));
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(2));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn put_if_current_refuses_after_clear() {
        let cache = MemoryCache::new();
        let before = cache.generation();
        cache.clear();
        assert!(!cache.put_if_current("k", 1u32, Duration::from_secs(60), before));
        assert!(cache.get("k").is_none());

        let now = cache.generation();
        assert!(cache.put_if_current("k", 2u32, Duration::from_secs(60), now));
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn invalidate_bumps_generation() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        let before = cache.generation();
        cache.invalidate("missing");
        assert_ne!(cache.generation(), before);
    }

    #[test]
    fn usable_as_trait_object() {
        let cache: Arc<dyn Cache<String>> = Arc::new(MemoryCache::new());
        cache.put("k", "v".to_string(), Duration::from_secs(1));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }
}
