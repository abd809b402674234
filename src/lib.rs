//! # ChainStore - Tiered Storage Units for Node Data
//!
//! ChainStore is the storage layer of a blockchain node. Every data bank the node
//! keeps (blocks, transactions, headers, tries) is a *storage unit*: a bounded
//! in-memory cache in front of a durable key/value persister.
//!
//! ## Features
//!
//! - **Pluggable Caches**: count-bounded LRU, byte-bounded LRU and sharded FIFO
//! - **Write-Through**: writes hit the cache and the persister; a failed durable
//!   write rolls the cache back
//! - **Read-Through**: cache misses fall back to the persister and back-fill the cache
//! - **Resilient Startup**: persister creation is retried with a fixed backoff
//! - **Time Cache**: "seen within the last D?" deduplication with lazy and active expiry
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              ChainStore                                 │
//! │                                                                         │
//! │   CacheConfig ──> new_cache ─────┐        DbConfig ──> PersisterFactory │
//! │                                  ▼                          │           │
//! │  ┌──────────────────────────────────────────────────┐       │ create_db │
//! │  │                  StorageUnit                     │<──────┘ (retry)   │
//! │  │  ┌──────────────────────┐ ┌────────────────────┐ │                   │
//! │  │  │ Cacher               │ │ Persister          │ │                   │
//! │  │  │ LRU/SizeLRU/FIFO     │ │ MemoryDB/injected  │ │                   │
//! │  │  └──────────────────────┘ └────────────────────┘ │                   │
//! │  └──────────────────────────────────────────────────┘                   │
//! │                                                                         │
//! │  ┌─────────────────────┐          ┌─────────────────────────────────┐   │
//! │  │     TimeCache       │<─sweep───│        ExpirySweeper            │   │
//! │  │ (independent of     │          │     (Background Tokio Task)     │   │
//! │  │  storage units)     │          └─────────────────────────────────┘   │
//! │  └─────────────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use chainstore::cache::{CacheConfig, CacheType};
//! use chainstore::persister::{DbConfig, DbPersisterFactory, DbType};
//! use chainstore::storage::{new_storage_unit_from_conf, Storer};
//!
//! let cache_conf = CacheConfig::new("txs", CacheType::Lru).with_capacity(2);
//! let db_conf = DbConfig::new("", DbType::MemoryDb).with_batch(1, 2);
//! let factory = DbPersisterFactory::new(db_conf.clone());
//!
//! let unit = new_storage_unit_from_conf(&cache_conf, &db_conf, &factory).unwrap();
//! unit.put(b"a", b"1").unwrap();
//! unit.put(b"b", b"2").unwrap();
//! unit.put(b"c", b"3").unwrap();
//!
//! // "a" was evicted from the cache but is still persisted
//! assert!(!unit.is_cached(b"a"));
//! assert_eq!(&unit.get(b"a").unwrap()[..], b"1");
//! assert!(unit.is_cached(b"a"));
//! ```
//!
//! ## Module Overview
//!
//! - [`cache`]: the [`Cacher`](cache::Cacher) capability and its implementations
//! - [`persister`]: the [`Persister`](persister::Persister) capability, factory and retry
//! - [`storage`]: the [`StorageUnit`](storage::StorageUnit) composing both
//! - [`timecache`]: the expiring time cache and its background sweeper
//! - [`hashing`]: hash algorithms selectable by name
//! - [`monitoring`]: process-wide cache capacity accounting
//! - [`error`]: the [`StorageError`](error::StorageError) taxonomy
//!
//! ## Design Highlights
//!
//! ### Cache Consistency
//!
//! For any key, a unit's cache holds either nothing or the exact bytes last
//! durably written. Eviction only ever drops cache entries, never durable ones.
//!
//! ### Thread Safety
//!
//! Caches lock internally (the FIFO cache per shard), storage units guard both
//! media with one reader-writer lock, and time caches use a read-then-write
//! lookup so live entries are checked under a shared lock.

pub mod cache;
pub mod error;
pub mod hashing;
pub mod monitoring;
pub mod persister;
pub mod storage;
pub mod timecache;

// Re-export commonly used types for convenience
pub use cache::{new_cache, CacheConfig, CacheType, Cacher};
pub use error::{Result, StorageError};
pub use persister::{DbConfig, DbPersisterFactory, DbType, Persister, PersisterFactory};
pub use storage::{
    new_storage_unit_from_conf, new_storage_unit_from_unit_config, StorageUnit, Storer, UnitConfig,
};
pub use timecache::{ExpirySweeper, TimeCache, TimeCacher};

/// Version of ChainStore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
