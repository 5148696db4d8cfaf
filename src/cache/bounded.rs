//! Fixed-capacity least-recently-used cache.

use ::lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Generic key/value store bounded to `max_size` entries.
///
/// `get` promotes a hit to most-recently-used; inserting a new key at capacity
/// evicts exactly one entry, the least-recently-used. Re-setting an existing key
/// refreshes its recency without growing the cache.
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> BoundedCache<K, V> {
    /// A `max_size` of zero is treated as one.
    pub fn new(max_size: usize) -> Self {
        let cap = NonZeroUsize::new(max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<K, V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().get(key).cloned()
    }

    /// Insert or refresh `key`. Returns the entry evicted to make room, if any.
    pub fn set(&self, key: K, value: V) -> Option<(K, V)> {
        let mut cache = self.lock();
        if cache.contains(&key) {
            cache.put(key, value);
            return None;
        }
        cache.push(key, value)
    }

    /// Membership test that does not touch recency.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().contains(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().pop(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Keys from least- to most-recently used.
    pub fn keys(&self) -> Vec<K> {
        self.lock().iter().rev().map(|(k, _)| k.clone()).collect()
    }
}
