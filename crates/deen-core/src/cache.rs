use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;

pub const DEFAULT_CAPACITY: usize = 10;

/// A search result remembered for the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResult {
    pub pattern: String,
    pub matches: Vec<String>,
}

/// Bounded least-recently-used cache of search results, keyed by cleaned term
pub struct ResultCache<K = String, V = CachedResult> {
    inner: LruCache<K, V>,
}

impl<K: Hash + Eq, V> ResultCache<K, V> {
    /// A capacity of zero is treated as one
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: LruCache::new(capacity),
        }
    }

    /// Look up a key, making it the most recently used on a hit
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    /// Insert or refresh a key, evicting the least recently used entry when full
    pub fn set(&mut self, key: K, value: V) {
        self.inner.put(key, value);
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Hash + Eq, V> Default for ResultCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
