//! Fixed-capacity LRU map
//!
//! A thin policy layer over [`lru::LruCache`]. Lookups through [`find`]
//! leave the recency order alone; only [`get`] and [`push`] touch it. The
//! face manager relies on that split to decide for itself when an entry
//! counts as used.
//!
//! [`find`]: LruCacheContainer::find
//! [`get`]: LruCacheContainer::get
//! [`push`]: LruCacheContainer::push

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// LRU map with a fixed number of slots
pub struct LruCacheContainer<K: Hash + Eq, V> {
    cache: LruCache<K, V>,
}

impl<K: Hash + Eq, V> LruCacheContainer<K, V> {
    /// Create a container holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
        }
    }

    /// Look up without changing the recency order
    pub fn find(&self, key: &K) -> Option<&V> {
        self.cache.peek(key)
    }

    /// Look up and mark the entry as most recently used
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.cache.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.cache.contains(key)
    }

    pub fn is_full(&self) -> bool {
        self.cache.len() == self.cache.cap().get()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Insert as most recently used
    ///
    /// An existing entry for `key` is replaced in place. When the container
    /// is full the least recently used entry is evicted and returned.
    pub fn push(&mut self, key: K, value: V) -> Option<(K, V)> {
        if self.cache.contains(&key) {
            self.cache.put(key, value);
            return None;
        }
        self.cache.push(key, value)
    }

    /// Remove and return the least recently used entry
    pub fn pop_with_key(&mut self) -> Option<(K, V)> {
        self.cache.pop_lru()
    }

    /// The entry that the next eviction would remove
    pub fn peek_oldest(&self) -> Option<(&K, &V)> {
        self.cache.peek_lru()
    }

    /// Remove a specific entry
    pub fn erase(&mut self, key: &K) -> Option<V> {
        self.cache.pop(key)
    }

    pub fn count(&self) -> usize {
        self.cache.len()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Keys from most to least recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.cache.iter().map(|(k, _)| k)
    }
}

impl<K: Hash + Eq + Clone, V> LruCacheContainer<K, V> {
    /// Remove every entry whose key matches `pred`, returning them
    pub fn erase_where<P>(&mut self, mut pred: P) -> Vec<(K, V)>
    where
        P: FnMut(&K) -> bool,
    {
        let doomed: Vec<K> = self
            .cache
            .iter()
            .filter(|(k, _)| pred(k))
            .map(|(k, _)| k.clone())
            .collect();
        doomed
            .into_iter()
            .filter_map(|k| self.cache.pop(&k).map(|v| (k, v)))
            .collect()
    }
}

impl<K: Hash + Eq, V> std::fmt::Debug for LruCacheContainer<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCacheContainer")
            .field("count", &self.count())
            .field("capacity", &self.capacity())
            .finish()
    }
}
