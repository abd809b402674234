//! Storage Module
//!
//! The tiered storage unit: an in-memory cache engine in front of a durable
//! persister, exposed through the [`Storer`] capability.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StorageUnit                            │
//! │                   (RwLock over both)                        │
//! │  ┌──────────────────────────┐  ┌──────────────────────────┐ │
//! │  │   Box<dyn Cacher>        │  │   Arc<dyn Persister>     │ │
//! │  │   LRU / SizeLRU / FIFO   │  │   MemoryDB / injected    │ │
//! │  └──────────────────────────┘  └──────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//!              ▲                                ▲
//!              │ new_cache(CacheConfig)         │ create_db (retry)
//!              └──────── new_storage_unit_from_conf ────────────┘
//! ```
//!
//! ## Epochs
//!
//! A storage unit has no notion of epochs. The epoch-qualified operations of
//! [`Storer`] ignore the epoch and behave exactly like their plain counterparts;
//! [`Storer::get_oldest_epoch`] always fails.

pub mod unit;

pub use unit::{
    new_storage_unit, new_storage_unit_from_conf, new_storage_unit_from_conf_with_retry,
    new_storage_unit_from_unit_config, StorageUnit, UnitConfig, UnitStats,
};

use crate::error::Result;
use bytes::Bytes;

/// A key and the value stored under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValuePair {
    pub key: Bytes,
    pub value: Bytes,
}

/// The storer capability implemented by [`StorageUnit`].
pub trait Storer: Send + Sync {
    fn put(&self, key: &[u8], data: &[u8]) -> Result<()>;
    fn put_in_epoch(&self, key: &[u8], data: &[u8], epoch: u32) -> Result<()>;

    fn get(&self, key: &[u8]) -> Result<Bytes>;
    fn get_from_epoch(&self, key: &[u8], epoch: u32) -> Result<Bytes>;
    fn get_bulk_from_epoch(&self, keys: &[Bytes], epoch: u32) -> Result<Vec<KeyValuePair>>;

    /// `Ok(())` if the key is cached or persisted.
    fn has(&self, key: &[u8]) -> Result<()>;
    fn search_first(&self, key: &[u8]) -> Result<Bytes>;

    fn remove_from_current_epoch(&self, key: &[u8]) -> Result<()>;
    fn remove(&self, key: &[u8]) -> Result<()>;

    fn clear_cache(&self);
    fn destroy_unit(&self) -> Result<()>;
    fn close(&self) -> Result<()>;

    /// Calls `handler` for each persisted pair until it returns `false`.
    fn range_keys(&self, handler: &mut dyn FnMut(&[u8], &[u8]) -> bool);

    fn get_oldest_epoch(&self) -> Result<u32>;
}
