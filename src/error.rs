//! Error types shared by every storage component.
//!
//! Errors fall into three groups:
//!
//! - **Configuration errors** are detected synchronously while building a cache,
//!   persister or storage unit. They are never retried.
//! - **Persister errors** come from the durable medium. They are propagated verbatim;
//!   only persister *creation* is retried (see [`crate::persister::create_db`]).
//! - **Lifecycle errors** signal that an operation is no longer valid for a unit.

use thiserror::Error;

/// Boxed error produced by an externally supplied persister backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur while building or operating storage components.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The cache type name is not one of the supported kinds
    #[error("not supported cache type: {0}")]
    NotSupportedCacheType(String),

    /// The database type name is not one of the supported kinds
    #[error("not supported db type: {0}")]
    NotSupportedDbType(String),

    /// The hasher name is not one of the supported algorithms
    #[error("hash type not supported: {0}")]
    NotSupportedHashType(String),

    /// A byte budget was configured for the plain count-bounded LRU cache
    #[error("LRU cache does not support size in bytes")]
    LruCacheWithProvidedSize,

    /// The size-bounded LRU cache was configured below the minimum byte budget
    #[error("invalid size for LRU cache: provided {provided}, minimum {minimum}")]
    LruCacheInvalidSize { provided: u64, minimum: u64 },

    /// The cache geometry (capacity, shards) cannot hold any entry
    #[error("invalid cache config: {0}")]
    InvalidCacheConfig(String),

    /// The persister batch would not fit in the cache
    #[error("cache size is lower than batch size: batch {batch_size}, capacity {capacity}")]
    CacheSizeIsLowerThanBatchSize { batch_size: usize, capacity: u32 },

    /// The key is present in neither the cache nor the persister
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// The persister was closed and can no longer serve requests
    #[error("database is closed")]
    DbClosed,

    /// The storage unit was destroyed
    #[error("storage unit was destroyed")]
    UnitDestroyed,

    /// This storer does not partition data by epoch
    #[error("oldest epoch not available")]
    OldestEpochNotAvailable,

    /// Time caches do not accept empty keys
    #[error("empty key")]
    EmptyKey,

    /// I/O failure reported by a persister backend
    #[error("persister I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other failure reported by a persister backend
    #[error("persister backend error: {0}")]
    Backend(#[from] BoxError),
}

impl StorageError {
    /// Builds a [`StorageError::KeyNotFound`] rendering the key as hex.
    pub fn key_not_found(key: &[u8]) -> Self {
        StorageError::KeyNotFound(hex::encode(key))
    }

    /// Returns true for errors raised while validating configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StorageError::NotSupportedCacheType(_)
                | StorageError::NotSupportedDbType(_)
                | StorageError::NotSupportedHashType(_)
                | StorageError::LruCacheWithProvidedSize
                | StorageError::LruCacheInvalidSize { .. }
                | StorageError::InvalidCacheConfig(_)
                | StorageError::CacheSizeIsLowerThanBatchSize { .. }
        )
    }
}
