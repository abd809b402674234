//! Least-recently-used caches.
//!
//! One implementation backs both LRU policies:
//!
//! - **count-bounded** ([`LruCache::new`]): at most `capacity` entries.
//! - **size-bounded** ([`LruCache::with_size_in_bytes`]): at most `capacity` entries
//!   *and* at most `max_size_in_bytes` bytes of values.
//!
//! Recency is tracked with a monotonically increasing tick per access. The
//! `order` map goes from tick to key, so its first entry is always the least
//! recently used key.
//!
//! ```text
//!   entries: key ──> (value, size, tick)
//!   order:   tick ──> key          (BTreeMap, ascending = LRU → MRU)
//! ```

use super::{Cacher, MIN_SIZE_FOR_LRU_CACHE};
use crate::error::{Result, StorageError};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

#[derive(Debug)]
struct LruEntry {
    value: Bytes,
    size: u64,
    tick: u64,
}

#[derive(Debug, Default)]
struct LruState {
    entries: HashMap<Bytes, LruEntry>,
    order: BTreeMap<u64, Bytes>,
    next_tick: u64,
    size_in_bytes: u64,
}

impl LruState {
    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    /// Promotes `key` to most recently used and returns its value.
    fn touch(&mut self, key: &[u8]) -> Option<Bytes> {
        let tick = self.bump();
        let entry = self.entries.get_mut(key)?;
        let previous = std::mem::replace(&mut entry.tick, tick);
        let value = entry.value.clone();

        if let Some(key) = self.order.remove(&previous) {
            self.order.insert(tick, key);
        }

        Some(value)
    }

    fn insert(&mut self, key: Bytes, value: Bytes, size: u64) {
        let tick = self.bump();
        let entry = LruEntry { value, size, tick };

        if let Some(old) = self.entries.insert(key.clone(), entry) {
            self.order.remove(&old.tick);
            self.size_in_bytes = self.size_in_bytes.saturating_sub(old.size);
        }

        self.order.insert(tick, key);
        self.size_in_bytes += size;
    }

    fn remove(&mut self, key: &[u8]) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.order.remove(&entry.tick);
                self.size_in_bytes = self.size_in_bytes.saturating_sub(entry.size);
                true
            }
            None => false,
        }
    }

    fn evict_oldest(&mut self) -> Option<Bytes> {
        let (_, key) = self.order.pop_first()?;
        if let Some(entry) = self.entries.remove(&key) {
            self.size_in_bytes = self.size_in_bytes.saturating_sub(entry.size);
        }
        Some(key)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.size_in_bytes = 0;
    }
}

/// Thread-safe LRU cache bounded by entry count and, optionally, byte size.
///
/// # Example
///
/// ```
/// use chainstore::cache::{Cacher, LruCache};
/// use bytes::Bytes;
///
/// let cache = LruCache::with_size_in_bytes(100, 2048).unwrap();
/// cache.put(Bytes::from("block"), Bytes::from(vec![0u8; 1500]), 1500);
/// cache.put(Bytes::from("header"), Bytes::from(vec![0u8; 600]), 600);
///
/// // 2100 bytes do not fit into 2048, so the older entry went away.
/// assert!(!cache.has(b"block"));
/// assert_eq!(cache.size_in_bytes_contained(), 600);
/// ```
#[derive(Debug)]
pub struct LruCache {
    state: Mutex<LruState>,
    capacity: usize,
    max_size_in_bytes: Option<u64>,
}

impl LruCache {
    /// Creates a count-bounded LRU cache holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(StorageError::InvalidCacheConfig(
                "LRU cache capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            state: Mutex::new(LruState::default()),
            capacity,
            max_size_in_bytes: None,
        })
    }

    /// Creates an LRU cache bounded by both `capacity` entries and
    /// `max_size_in_bytes` bytes of values.
    pub fn with_size_in_bytes(capacity: usize, max_size_in_bytes: u64) -> Result<Self> {
        if max_size_in_bytes < MIN_SIZE_FOR_LRU_CACHE {
            return Err(StorageError::LruCacheInvalidSize {
                provided: max_size_in_bytes,
                minimum: MIN_SIZE_FOR_LRU_CACHE,
            });
        }

        let mut cache = Self::new(capacity)?;
        cache.max_size_in_bytes = Some(max_size_in_bytes);
        Ok(cache)
    }

    /// Byte budget, if this is a size-bounded cache.
    pub fn max_size_in_bytes(&self) -> Option<u64> {
        self.max_size_in_bytes
    }

    #[inline]
    fn exceeds_bounds(&self, state: &LruState) -> bool {
        state.entries.len() > self.capacity
            || self
                .max_size_in_bytes
                .is_some_and(|max| state.size_in_bytes > max)
    }
}

impl Cacher for LruCache {
    /// An entry larger than the whole byte budget evicts every other entry and
    /// then itself, so the byte bound is never exceeded.
    fn put(&self, key: Bytes, value: Bytes, size_in_bytes: usize) -> bool {
        let mut state = self.state.lock();
        state.insert(key, value, size_in_bytes as u64);

        let mut evicted = 0usize;
        while self.exceeds_bounds(&state) {
            match state.evict_oldest() {
                Some(_) => evicted += 1,
                None => break,
            }
        }

        if evicted > 0 {
            trace!(
                evicted = evicted,
                entries = state.entries.len(),
                size_in_bytes = state.size_in_bytes,
                "LRU cache evicted entries"
            );
        }

        evicted > 0
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.state.lock().touch(key)
    }

    fn peek(&self, key: &[u8]) -> Option<Bytes> {
        self.state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
    }

    fn has(&self, key: &[u8]) -> bool {
        self.state.lock().entries.contains_key(key)
    }

    fn remove(&self, key: &[u8]) {
        self.state.lock().remove(key);
    }

    fn keys(&self) -> Vec<Bytes> {
        self.state.lock().order.values().cloned().collect()
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn size_in_bytes_contained(&self) -> u64 {
        self.state.lock().size_in_bytes
    }

    fn max_size(&self) -> usize {
        self.capacity
    }

    fn clear(&self) {
        self.state.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(cache: &LruCache, key: &str, value: &str) -> bool {
        cache.put(Bytes::from(key.to_string()), Bytes::from(value.to_string()), value.len())
    }

    #[test]
    fn test_put_and_get() {
        let cache = LruCache::new(4).unwrap();

        assert!(!put(&cache, "key", "value"));
        assert_eq!(cache.get(b"key"), Some(Bytes::from("value")));
        assert_eq!(cache.get(b"missing"), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert!(matches!(
            LruCache::new(0),
            Err(StorageError::InvalidCacheConfig(_))
        ));
    }

    #[test]
    fn test_evicts_first_inserted_without_access() {
        let cache = LruCache::new(3).unwrap();
        put(&cache, "a", "1");
        put(&cache, "b", "2");
        put(&cache, "c", "3");

        assert!(put(&cache, "d", "4"));

        assert!(!cache.has(b"a"));
        assert!(cache.has(b"b"));
        assert!(cache.has(b"c"));
        assert!(cache.has(b"d"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_get_promotes_entry() {
        let cache = LruCache::new(3).unwrap();
        put(&cache, "a", "1");
        put(&cache, "b", "2");
        put(&cache, "c", "3");

        assert!(cache.get(b"a").is_some());
        put(&cache, "d", "4");

        assert!(cache.has(b"a"));
        assert!(!cache.has(b"b"));
    }

    #[test]
    fn test_peek_and_has_do_not_promote() {
        let cache = LruCache::new(2).unwrap();
        put(&cache, "a", "1");
        put(&cache, "b", "2");

        assert_eq!(cache.peek(b"a"), Some(Bytes::from("1")));
        assert!(cache.has(b"a"));
        put(&cache, "c", "3");

        assert!(!cache.has(b"a"));
        assert!(cache.has(b"b"));
    }

    #[test]
    fn test_overwrite_updates_value_and_size() {
        let cache = LruCache::new(2).unwrap();
        put(&cache, "a", "1");
        put(&cache, "a", "12345");

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(b"a"), Some(Bytes::from("12345")));
        assert_eq!(cache.size_in_bytes_contained(), 5);
    }

    #[test]
    fn test_keys_in_recency_order() {
        let cache = LruCache::new(3).unwrap();
        put(&cache, "a", "1");
        put(&cache, "b", "2");
        put(&cache, "c", "3");
        cache.get(b"a");

        assert_eq!(
            cache.keys(),
            vec![Bytes::from("b"), Bytes::from("c"), Bytes::from("a")]
        );
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = LruCache::new(3).unwrap();
        put(&cache, "a", "1");
        put(&cache, "b", "22");

        cache.remove(b"a");
        cache.remove(b"missing");
        assert!(!cache.has(b"a"));
        assert_eq!(cache.size_in_bytes_contained(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.size_in_bytes_contained(), 0);
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_size_bounded_below_minimum() {
        assert!(matches!(
            LruCache::with_size_in_bytes(10, 100),
            Err(StorageError::LruCacheInvalidSize { provided: 100, .. })
        ));
    }

    #[test]
    fn test_size_bounded_evicts_until_under_budget() {
        let cache = LruCache::with_size_in_bytes(100, 1024).unwrap();
        let value = Bytes::from(vec![7u8; 400]);

        cache.put(Bytes::from("a"), value.clone(), 400);
        cache.put(Bytes::from("b"), value.clone(), 400);
        assert_eq!(cache.size_in_bytes_contained(), 800);

        assert!(cache.put(Bytes::from("c"), value.clone(), 400));
        assert!(!cache.has(b"a"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.size_in_bytes_contained(), 800);
    }

    #[test]
    fn test_size_bounded_also_respects_count() {
        let cache = LruCache::with_size_in_bytes(2, 4096).unwrap();
        put(&cache, "a", "1");
        put(&cache, "b", "2");
        put(&cache, "c", "3");

        assert_eq!(cache.len(), 2);
        assert!(!cache.has(b"a"));
    }

    #[test]
    fn test_max_size_in_bytes_reports_bound() {
        assert_eq!(LruCache::new(10).unwrap().max_size_in_bytes(), None);
        assert_eq!(
            LruCache::with_size_in_bytes(10, 1024).unwrap().max_size_in_bytes(),
            Some(1024)
        );
    }

    #[test]
    fn test_size_bounded_oversized_entry_is_not_kept() {
        let cache = LruCache::with_size_in_bytes(10, 1024).unwrap();
        put(&cache, "small", "x");

        let huge = Bytes::from(vec![0u8; 2048]);
        assert!(cache.put(Bytes::from("huge"), huge, 2048));

        assert!(!cache.has(b"huge"));
        assert!(!cache.has(b"small"));
        assert_eq!(cache.size_in_bytes_contained(), 0);
    }

    #[test]
    fn test_bounds_hold_under_random_sequence() {
        let cache = LruCache::with_size_in_bytes(16, 1024).unwrap();

        for i in 0..500usize {
            let size = (i * 37) % 300;
            let key = Bytes::from(format!("key-{}", i % 40));
            if i % 7 == 0 {
                cache.remove(&key);
            } else {
                cache.put(key, Bytes::from(vec![1u8; size]), size);
            }
            assert!(cache.len() <= 16);
            assert!(cache.size_in_bytes_contained() <= 1024);
        }
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let cache = Arc::new(LruCache::new(100).unwrap());
        let mut handles = vec![];

        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(thread::spawn(move || {
                for j in 0..200 {
                    let key = Bytes::from(format!("key-{}-{}", i, j));
                    cache.put(key.clone(), Bytes::from("value"), 5);
                    cache.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 100);
    }
}
