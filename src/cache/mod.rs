//! Cache Engine Module
//!
//! Bounded, thread-safe in-memory key/value caches sitting in front of a
//! [`Persister`](crate::persister::Persister). Every policy implements the
//! [`Cacher`] capability, so a storage unit never knows which one it holds.
//!
//! ## Policies
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────┬────────────────────────────┐
//! │ CacheType            │ Bound                    │ Eviction                   │
//! ├──────────────────────┼──────────────────────────┼────────────────────────────┤
//! │ LRU                  │ entry count              │ least recently used        │
//! │ SizeLRU              │ entry count + byte size  │ least recently used        │
//! │ FIFOSharded          │ entry count per shard    │ oldest inserted, per shard │
//! └──────────────────────┴──────────────────────────┴────────────────────────────┘
//! ```
//!
//! The LRU variants keep one lock per cache, so all key traffic is serialized.
//! The sharded FIFO cache hashes each key to one of N independently locked shards
//! and never tracks access order, which makes unrelated keys contention-free.
//!
//! ## Example
//!
//! ```
//! use chainstore::cache::{new_cache, CacheConfig, CacheType};
//! use bytes::Bytes;
//!
//! let config = CacheConfig::new("headers", CacheType::Lru).with_capacity(2);
//! let cache = new_cache(&config).unwrap();
//!
//! cache.put(Bytes::from("a"), Bytes::from("1"), 1);
//! cache.put(Bytes::from("b"), Bytes::from("2"), 1);
//! cache.get(b"a");
//! cache.put(Bytes::from("c"), Bytes::from("3"), 1);
//!
//! assert!(cache.has(b"a"));
//! assert!(!cache.has(b"b"));
//! ```

pub mod fifo;
pub mod lru;

pub use fifo::ShardedFifoCache;
pub use lru::LruCache;

use crate::error::{Result, StorageError};
use crate::monitoring;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

/// Smallest byte budget accepted by the size-bounded LRU cache.
pub const MIN_SIZE_FOR_LRU_CACHE: u64 = 1024;

/// A bounded, concurrent-safe key/value cache with automatic eviction.
///
/// None of the operations fail on valid input. For size-bounded caches the
/// `size_in_bytes` hint passed to [`Cacher::put`] must equal the value's length;
/// a mismatch is a caller bug, not a recoverable error.
pub trait Cacher: Send + Sync {
    /// Inserts or overwrites `key`, evicting entries until the bound holds.
    ///
    /// In a size-bounded cache an entry whose `size_in_bytes` exceeds the whole
    /// byte budget is never kept: it evicts everything else and then itself.
    /// Callers must not assume a `put` value is cached afterwards.
    ///
    /// Returns `true` if at least one entry was evicted.
    fn put(&self, key: Bytes, value: Bytes, size_in_bytes: usize) -> bool;

    /// Looks up `key`. LRU variants promote a hit to most recently used.
    fn get(&self, key: &[u8]) -> Option<Bytes>;

    /// Looks up `key` without touching recency.
    fn peek(&self, key: &[u8]) -> Option<Bytes>;

    /// Existence check without promotion.
    fn has(&self, key: &[u8]) -> bool;

    /// Removes `key` if present.
    fn remove(&self, key: &[u8]);

    /// Snapshot of the cached keys, oldest first.
    fn keys(&self) -> Vec<Bytes>;

    /// Number of cached entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the size hints of all cached entries.
    fn size_in_bytes_contained(&self) -> u64;

    /// Configured maximum number of entries.
    fn max_size(&self) -> usize;

    /// Drops every entry and resets the accounting.
    fn clear(&self);
}

/// Supported cache policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheType {
    #[default]
    Lru,
    SizeLru,
    FifoSharded,
}

impl CacheType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheType::Lru => "LRU",
            CacheType::SizeLru => "SizeLRU",
            CacheType::FifoSharded => "FIFOSharded",
        }
    }
}

impl FromStr for CacheType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LRU" => Ok(CacheType::Lru),
            "SizeLRU" => Ok(CacheType::SizeLru),
            "FIFOSharded" => Ok(CacheType::FifoSharded),
            other => Err(StorageError::NotSupportedCacheType(other.to_string())),
        }
    }
}

impl fmt::Display for CacheType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a cache instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Name reported to the monitoring hook
    pub name: String,
    /// Eviction policy
    pub cache_type: CacheType,
    /// Byte budget; must be zero for [`CacheType::Lru`]
    pub size_in_bytes: u64,
    /// Byte budget per sender, reserved for sender-aware caches
    pub size_in_bytes_per_sender: u32,
    /// Maximum number of entries
    pub capacity: u32,
    /// Entries per sender, reserved for sender-aware caches
    pub size_per_sender: u32,
    /// Number of shards for [`CacheType::FifoSharded`]
    pub shards: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            cache_type: CacheType::Lru,
            size_in_bytes: 0,
            size_in_bytes_per_sender: 0,
            capacity: 1000,
            size_per_sender: 0,
            shards: 1,
        }
    }
}

impl CacheConfig {
    /// Creates a config with default bounds for the given policy.
    pub fn new(name: impl Into<String>, cache_type: CacheType) -> Self {
        Self {
            name: name.into(),
            cache_type,
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_size_in_bytes(mut self, size_in_bytes: u64) -> Self {
        self.size_in_bytes = size_in_bytes;
        self
    }

    pub fn with_shards(mut self, shards: u32) -> Self {
        self.shards = shards;
        self
    }

    pub fn with_sender_limits(mut self, size_per_sender: u32, size_in_bytes_per_sender: u32) -> Self {
        self.size_per_sender = size_per_sender;
        self.size_in_bytes_per_sender = size_in_bytes_per_sender;
        self
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{name: {:?}, type: {}, size_in_bytes: {}, size_in_bytes_per_sender: {}, \
             capacity: {}, size_per_sender: {}, shards: {}}}",
            self.name,
            self.cache_type,
            self.size_in_bytes,
            self.size_in_bytes_per_sender,
            self.capacity,
            self.size_per_sender,
            self.shards
        )
    }
}

/// Builds the cache selected by `config.cache_type`.
///
/// Validates the policy-specific constraints first: a plain LRU cache must not
/// carry a byte budget and a size-bounded LRU cache needs at least
/// [`MIN_SIZE_FOR_LRU_CACHE`] bytes. On success the cache is reported to the
/// monitoring hook.
pub fn new_cache(config: &CacheConfig) -> Result<Box<dyn Cacher>> {
    let capacity = config.capacity as usize;

    let cacher: Box<dyn Cacher> = match config.cache_type {
        CacheType::Lru => {
            if config.size_in_bytes != 0 {
                return Err(StorageError::LruCacheWithProvidedSize);
            }
            Box::new(LruCache::new(capacity)?)
        }
        CacheType::SizeLru => Box::new(LruCache::with_size_in_bytes(
            capacity,
            config.size_in_bytes,
        )?),
        CacheType::FifoSharded => {
            Box::new(ShardedFifoCache::new(capacity, config.shards as usize)?)
        }
    };

    monitoring::monitor_new_cache(&config.name, config.size_in_bytes);

    Ok(cacher)
}
