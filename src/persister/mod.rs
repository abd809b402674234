//! Persister Module
//!
//! The durable half of a storage unit. A [`Persister`] is an opaque
//! byte-string-to-byte-string store; concrete engines (disk-backed log-structured
//! stores, the in-memory [`MemoryDb`]) live behind the trait and are produced by a
//! [`PersisterFactory`].
//!
//! ## Creation
//!
//! ```text
//!   DbConfig ──> DbPersisterFactory ──create(path)──> Box<dyn Persister>
//!                   │
//!                   ├── LvlDB        ──> injected builder
//!                   ├── LvlDBSerial  ──> injected builder
//!                   └── MemoryDB     ──> MemoryDb (registered by default)
//! ```
//!
//! Creation can fail transiently (e.g. a lock file still held by a previous process),
//! so storage units acquire persisters through [`create_db`], which retries with a
//! fixed backoff.

pub mod factory;
pub mod memory;
pub mod retry;

pub use factory::{DbPersisterFactory, PersisterBuilder, PersisterFactory};
pub use memory::MemoryDb;
pub use retry::{
    create_db, create_db_with_retry, RetryPolicy, Sleeper, ThreadSleeper,
    MAX_RETRIES_TO_CREATE_DB, SLEEP_TIME_BETWEEN_CREATE_DB_RETRIES,
};

use crate::error::{Result, StorageError};
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

/// A durable key/value store.
///
/// Values returned by [`Persister::get`] must be exactly the bytes last
/// successfully stored with [`Persister::put`].
pub trait Persister: Send + Sync {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Returns the stored value or [`StorageError::KeyNotFound`].
    fn get(&self, key: &[u8]) -> Result<Bytes>;

    /// Returns `Ok(())` if the key is stored, otherwise the reason it is not.
    fn has(&self, key: &[u8]) -> Result<()>;

    fn remove(&self, key: &[u8]) -> Result<()>;

    /// Calls `handler` for each stored pair until it returns `false`.
    fn range_keys(&self, handler: &mut dyn FnMut(&[u8], &[u8]) -> bool);

    fn close(&self) -> Result<()>;

    /// Irreversibly drops all stored data.
    fn destroy(&self) -> Result<()>;
}

/// Supported persister backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DbType {
    /// Disk-backed store with concurrent batch writes
    LvlDb,
    /// Disk-backed store with serialized access
    LvlDbSerial,
    /// In-memory map, nothing survives the process
    #[default]
    MemoryDb,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::LvlDb => "LvlDB",
            DbType::LvlDbSerial => "LvlDBSerial",
            DbType::MemoryDb => "MemoryDB",
        }
    }
}

impl FromStr for DbType {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LvlDB" => Ok(DbType::LvlDb),
            "LvlDBSerial" => Ok(DbType::LvlDbSerial),
            "MemoryDB" => Ok(DbType::MemoryDb),
            other => Err(StorageError::NotSupportedDbType(other.to_string())),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a persister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Location of the store on disk
    pub file_path: String,
    /// Backend kind
    pub db_type: DbType,
    /// Seconds between batch flushes
    pub batch_delay_seconds: u64,
    /// Maximum writes per batch; must not exceed the cache capacity
    pub max_batch_size: usize,
    /// Maximum number of open file handles
    pub max_open_files: usize,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            file_path: String::new(),
            db_type: DbType::MemoryDb,
            batch_delay_seconds: 2,
            max_batch_size: 100,
            max_open_files: 10,
        }
    }
}

impl DbConfig {
    pub fn new(file_path: impl Into<String>, db_type: DbType) -> Self {
        Self {
            file_path: file_path.into(),
            db_type,
            ..Default::default()
        }
    }

    pub fn with_batch(mut self, batch_delay_seconds: u64, max_batch_size: usize) -> Self {
        self.batch_delay_seconds = batch_delay_seconds;
        self.max_batch_size = max_batch_size;
        self
    }

    pub fn with_max_open_files(mut self, max_open_files: usize) -> Self {
        self.max_open_files = max_open_files;
        self
    }
}

/// Everything a backend builder needs to open a persister.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgDb {
    pub db_type: DbType,
    pub path: String,
    pub batch_delay_seconds: u64,
    pub max_batch_size: usize,
    pub max_open_files: usize,
}

impl ArgDb {
    /// Combines the backend settings of `config` with a concrete `path`.
    pub fn from_config(config: &DbConfig, path: &str) -> Self {
        Self {
            db_type: config.db_type,
            path: path.to_string(),
            batch_delay_seconds: config.batch_delay_seconds,
            max_batch_size: config.max_batch_size,
            max_open_files: config.max_open_files,
        }
    }
}
