//! Sharded first-in-first-out cache.
//!
//! The key space is split across N shards, each with its own lock and its own
//! slice of the capacity. Eviction drops the oldest inserted entry of the shard
//! that overflowed, so pressure on one shard never evicts keys living in another.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    ShardedFifoCache                       │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐     ┌──────────┐  │
//! │  │ Shard 0  │ │ Shard 1  │ │ Shard 2  │ ... │ Shard N  │  │
//! │  │ Mutex    │ │ Mutex    │ │ Mutex    │     │ Mutex    │  │
//! │  │ cap/N    │ │ cap/N    │ │ cap/N    │     │ cap/N    │  │
//! │  └──────────┘ └──────────┘ └──────────┘     └──────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! No access order is tracked: reads never take more than the shard lock and
//! never reorder anything.

use super::Cacher;
use crate::error::{Result, StorageError};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::hash::{DefaultHasher, Hash, Hasher};
use tracing::trace;

#[derive(Debug)]
struct FifoEntry {
    value: Bytes,
    size: u64,
    seq: u64,
}

/// One independently locked slice of the cache.
///
/// `order` may hold stale `(seq, key)` pairs for removed keys; they are skipped
/// on eviction and compacted once they outnumber the live entries.
#[derive(Debug)]
struct FifoShard {
    entries: HashMap<Bytes, FifoEntry>,
    order: VecDeque<(u64, Bytes)>,
    next_seq: u64,
    capacity: usize,
    size_in_bytes: u64,
}

impl FifoShard {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            capacity,
            size_in_bytes: 0,
        }
    }

    fn put(&mut self, key: Bytes, value: Bytes, size: u64) -> bool {
        // Overwrites keep their original insertion position.
        if let Some(entry) = self.entries.get_mut(&key) {
            self.size_in_bytes = self.size_in_bytes.saturating_sub(entry.size) + size;
            entry.value = value;
            entry.size = size;
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.push_back((seq, key.clone()));
        self.entries.insert(key, FifoEntry { value, size, seq });
        self.size_in_bytes += size;

        let mut evicted = false;
        while self.entries.len() > self.capacity {
            if !self.evict_oldest() {
                break;
            }
            evicted = true;
        }
        evicted
    }

    fn evict_oldest(&mut self) -> bool {
        while let Some((seq, key)) = self.order.pop_front() {
            let live = self.entries.get(&key).is_some_and(|entry| entry.seq == seq);
            if live {
                if let Some(entry) = self.entries.remove(&key) {
                    self.size_in_bytes = self.size_in_bytes.saturating_sub(entry.size);
                }
                return true;
            }
        }
        false
    }

    fn remove(&mut self, key: &[u8]) {
        if let Some(entry) = self.entries.remove(key) {
            self.size_in_bytes = self.size_in_bytes.saturating_sub(entry.size);
            if self.order.len() > self.capacity * 2 {
                self.compact();
            }
        }
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(seq, key)| entries.get(key).is_some_and(|entry| entry.seq == *seq));
    }

    fn live_keys(&self) -> impl Iterator<Item = &Bytes> + '_ {
        self.order.iter().filter_map(|(seq, key)| {
            self.entries
                .get(key)
                .filter(|entry| entry.seq == *seq)
                .map(|_| key)
        })
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.size_in_bytes = 0;
    }
}

/// Thread-safe FIFO cache partitioned into independently locked shards.
///
/// # Example
///
/// ```
/// use chainstore::cache::{Cacher, ShardedFifoCache};
/// use bytes::Bytes;
///
/// let cache = ShardedFifoCache::new(1024, 16).unwrap();
/// cache.put(Bytes::from("tx-hash"), Bytes::from("tx-body"), 7);
/// assert_eq!(cache.get(b"tx-hash"), Some(Bytes::from("tx-body")));
/// ```
#[derive(Debug)]
pub struct ShardedFifoCache {
    shards: Vec<Mutex<FifoShard>>,
    capacity: usize,
}

impl ShardedFifoCache {
    /// Creates a cache of `capacity` entries split evenly over `shards` shards.
    ///
    /// Each shard holds `capacity / shards` entries, so the total never exceeds
    /// `capacity`. Fails if `shards` is zero or larger than `capacity`.
    pub fn new(capacity: usize, shards: usize) -> Result<Self> {
        if shards == 0 {
            return Err(StorageError::InvalidCacheConfig(
                "number of shards must be greater than zero".to_string(),
            ));
        }
        if capacity < shards {
            return Err(StorageError::InvalidCacheConfig(format!(
                "capacity {} is lower than the number of shards {}",
                capacity, shards
            )));
        }

        let per_shard = capacity / shards;
        let shards = (0..shards)
            .map(|_| Mutex::new(FifoShard::new(per_shard)))
            .collect();

        Ok(Self { shards, capacity })
    }

    /// Number of shards.
    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }

    /// Determines which shard a key belongs to.
    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.shards.len()
    }

    #[inline]
    fn shard(&self, key: &[u8]) -> &Mutex<FifoShard> {
        &self.shards[self.shard_index(key)]
    }
}

impl Cacher for ShardedFifoCache {
    fn put(&self, key: Bytes, value: Bytes, size_in_bytes: usize) -> bool {
        let index = self.shard_index(&key);
        let evicted = self.shards[index]
            .lock()
            .put(key, value, size_in_bytes as u64);

        if evicted {
            trace!(shard = index, "FIFO shard evicted oldest entry");
        }

        evicted
    }

    fn get(&self, key: &[u8]) -> Option<Bytes> {
        self.peek(key)
    }

    fn peek(&self, key: &[u8]) -> Option<Bytes> {
        self.shard(key)
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
    }

    fn has(&self, key: &[u8]) -> bool {
        self.shard(key).lock().entries.contains_key(key)
    }

    fn remove(&self, key: &[u8]) {
        self.shard(key).lock().remove(key);
    }

    fn keys(&self) -> Vec<Bytes> {
        let mut keys = Vec::new();
        for shard in &self.shards {
            let shard = shard.lock();
            keys.extend(shard.live_keys().cloned());
        }
        keys
    }

    fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().entries.len()).sum()
    }

    fn size_in_bytes_contained(&self) -> u64 {
        self.shards.iter().map(|shard| shard.lock().size_in_bytes).sum()
    }

    fn max_size(&self) -> usize {
        self.capacity
    }

    fn clear(&self) {
        for shard in &self.shards {
            shard.lock().clear();
        }
    }
}
