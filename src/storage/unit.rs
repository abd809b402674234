//! Storage Unit: a cache in front of a persister.
//!
//! A [`StorageUnit`] owns exactly one [`Cacher`] and one [`Persister`] and keeps
//! them consistent: for any key the cache either holds nothing or holds the exact
//! bytes last durably written.
//!
//! ## Read and write paths
//!
//! ```text
//!   put(k, v)                          get(k)
//!   ─────────                          ──────
//!   write lock                         read lock ── cache hit ──> v
//!   cache.put(k, v)                        │ miss
//!   persister.put(k, v) ──err──┐       write lock
//!          │ ok                │       cache hit? ──────────────> v
//!          ▼                   ▼       persister.get(k) ──err──> err
//!         Ok        cache.remove(k)    cache.put(k, v)  (back-fill)
//!                   return err                │
//!                                             ▼
//!                                             v
//! ```
//!
//! ## Concurrency
//!
//! One reader-writer lock covers both media. Mutations (`put`, `remove`,
//! `destroy_unit`, `close`) take it exclusively, so a concurrent `get` observes
//! either the state before a write or the state after it, never a half-applied one.

use super::{KeyValuePair, Storer};
use crate::cache::{new_cache, CacheConfig, Cacher};
use crate::error::{Result, StorageError};
use crate::persister::{
    create_db_with_retry, DbConfig, Persister, PersisterFactory, RetryPolicy, Sleeper,
    ThreadSleeper,
};
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Cache and persister configuration of a storage unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitConfig {
    pub cache_conf: CacheConfig,
    pub db_conf: DbConfig,
}

impl UnitConfig {
    pub fn new(cache_conf: CacheConfig, db_conf: DbConfig) -> Self {
        Self {
            cache_conf,
            db_conf,
        }
    }
}

/// Point-in-time statistics of a storage unit's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    /// Entries currently cached
    pub cached_entries: usize,
    /// Sum of the cached values' sizes
    pub cached_bytes: u64,
    /// Maximum number of cached entries
    pub max_cached_entries: usize,
}

struct UnitInner {
    cacher: Box<dyn Cacher>,
    persister: Arc<dyn Persister>,
    destroyed: bool,
}

impl UnitInner {
    #[inline]
    fn ensure_usable(&self) -> Result<()> {
        if self.destroyed {
            Err(StorageError::UnitDestroyed)
        } else {
            Ok(())
        }
    }
}

/// A storer's data bank: an in-memory cache fronting a durable persister.
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared across threads.
/// All operations are thread-safe.
///
/// # Example
///
/// ```
/// use chainstore::cache::{CacheConfig, CacheType};
/// use chainstore::persister::{DbConfig, DbPersisterFactory, DbType};
/// use chainstore::storage::{new_storage_unit_from_conf, Storer};
///
/// let cache_conf = CacheConfig::new("blocks", CacheType::Lru).with_capacity(100);
/// let db_conf = DbConfig::new("", DbType::MemoryDb).with_batch(1, 10);
/// let factory = DbPersisterFactory::new(db_conf.clone());
///
/// let unit = new_storage_unit_from_conf(&cache_conf, &db_conf, &factory).unwrap();
/// unit.put(b"hash", b"block").unwrap();
/// assert_eq!(&unit.get(b"hash").unwrap()[..], b"block");
/// ```
pub struct StorageUnit {
    inner: RwLock<UnitInner>,
}

impl std::fmt::Debug for StorageUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("StorageUnit")
            .field("cached_entries", &inner.cacher.len())
            .field("max_cached_entries", &inner.cacher.max_size())
            .field("destroyed", &inner.destroyed)
            .finish()
    }
}

impl StorageUnit {
    /// Composes a unit from pre-built cache and persister handles.
    ///
    /// The unit takes exclusive ownership of both.
    pub fn new(cacher: Box<dyn Cacher>, persister: Box<dyn Persister>) -> Self {
        Self {
            inner: RwLock::new(UnitInner {
                cacher,
                persister: Arc::from(persister),
                destroyed: false,
            }),
        }
    }

    /// Returns true if `key` is currently held by the cache. Does not promote it.
    pub fn is_cached(&self, key: &[u8]) -> bool {
        self.inner.read().cacher.has(key)
    }

    /// Snapshot of the cached keys, oldest first.
    pub fn cached_keys(&self) -> Vec<Bytes> {
        self.inner.read().cacher.keys()
    }

    pub fn stats(&self) -> UnitStats {
        let inner = self.inner.read();
        UnitStats {
            cached_entries: inner.cacher.len(),
            cached_bytes: inner.cacher.size_in_bytes_contained(),
            max_cached_entries: inner.cacher.max_size(),
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.read().destroyed
    }
}

impl Storer for StorageUnit {
    /// Writes to the cache, then to the persister. A failed durable write removes
    /// the cache entry again and returns the persister's error.
    fn put(&self, key: &[u8], data: &[u8]) -> Result<()> {
        let inner = self.inner.write();
        inner.ensure_usable()?;

        inner.cacher.put(
            Bytes::copy_from_slice(key),
            Bytes::copy_from_slice(data),
            data.len(),
        );

        if let Err(err) = inner.persister.put(key, data) {
            inner.cacher.remove(key);
            debug!(key = %hex::encode(key), error = %err, "durable write failed, cache entry rolled back");
            return Err(err);
        }

        Ok(())
    }

    fn put_in_epoch(&self, key: &[u8], data: &[u8], _epoch: u32) -> Result<()> {
        self.put(key, data)
    }

    /// Reads from the cache first; on a miss reads the persister and back-fills
    /// the cache so the next read of `key` is a hit.
    fn get(&self, key: &[u8]) -> Result<Bytes> {
        // Fast path: shared lock, cache hit
        {
            let inner = self.inner.read();
            inner.ensure_usable()?;
            if let Some(value) = inner.cacher.get(key) {
                return Ok(value);
            }
        }

        let inner = self.inner.write();
        inner.ensure_usable()?;

        // Another reader may have back-filled the key meanwhile
        if let Some(value) = inner.cacher.get(key) {
            return Ok(value);
        }

        let value = inner.persister.get(key)?;
        inner
            .cacher
            .put(Bytes::copy_from_slice(key), value.clone(), value.len());

        Ok(value)
    }

    fn get_from_epoch(&self, key: &[u8], _epoch: u32) -> Result<Bytes> {
        self.get(key)
    }

    /// Gets every key, skipping (and logging) the ones that cannot be read.
    fn get_bulk_from_epoch(&self, keys: &[Bytes], _epoch: u32) -> Result<Vec<KeyValuePair>> {
        let mut results = Vec::with_capacity(keys.len());
        for key in keys {
            match self.get(key) {
                Ok(value) => results.push(KeyValuePair {
                    key: key.clone(),
                    value,
                }),
                Err(err) => {
                    warn!(key = %hex::encode(key), error = %err, "cannot get key from unit");
                }
            }
        }
        Ok(results)
    }

    fn has(&self, key: &[u8]) -> Result<()> {
        let inner = self.inner.read();
        inner.ensure_usable()?;

        if inner.cacher.has(key) {
            return Ok(());
        }

        inner.persister.has(key)
    }

    fn search_first(&self, key: &[u8]) -> Result<Bytes> {
        self.get(key)
    }

    fn remove_from_current_epoch(&self, key: &[u8]) -> Result<()> {
        self.remove(key)
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        let inner = self.inner.write();
        inner.ensure_usable()?;

        inner.cacher.remove(key);
        inner.persister.remove(key)
    }

    fn clear_cache(&self) {
        self.inner.write().cacher.clear();
    }

    /// Clears the cache and irreversibly destroys the persisted data. Every
    /// later operation fails with [`StorageError::UnitDestroyed`].
    fn destroy_unit(&self) -> Result<()> {
        let mut inner = self.inner.write();
        inner.ensure_usable()?;

        inner.cacher.clear();
        inner.persister.destroy()?;
        inner.destroyed = true;

        info!("storage unit destroyed");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let inner = self.inner.write();
        inner.cacher.clear();

        if let Err(err) = inner.persister.close() {
            error!(error = %err, "cannot close storage unit persister");
            return Err(err);
        }

        Ok(())
    }

    /// Iterates the persisted pairs only; the cache is a subset view.
    ///
    /// The unit lock is released before iterating, so `handler` may call back
    /// into the unit.
    fn range_keys(&self, handler: &mut dyn FnMut(&[u8], &[u8]) -> bool) {
        let persister = {
            let inner = self.inner.read();
            if inner.destroyed {
                return;
            }
            Arc::clone(&inner.persister)
        };

        persister.range_keys(handler);
    }

    fn get_oldest_epoch(&self) -> Result<u32> {
        Err(StorageError::OldestEpochNotAvailable)
    }
}

/// Composes a storage unit from pre-built cache and persister handles.
pub fn new_storage_unit(cacher: Box<dyn Cacher>, persister: Box<dyn Persister>) -> StorageUnit {
    StorageUnit::new(cacher, persister)
}

/// Builds a storage unit from a [`UnitConfig`], retrying persister creation
/// with the default [`RetryPolicy`].
pub fn new_storage_unit_from_unit_config(
    config: &UnitConfig,
    factory: &dyn PersisterFactory,
) -> Result<StorageUnit> {
    new_storage_unit_from_conf(&config.cache_conf, &config.db_conf, factory)
}

/// Builds a storage unit from configuration, retrying persister creation with
/// the default [`RetryPolicy`].
pub fn new_storage_unit_from_conf(
    cache_conf: &CacheConfig,
    db_conf: &DbConfig,
    factory: &dyn PersisterFactory,
) -> Result<StorageUnit> {
    new_storage_unit_from_conf_with_retry(
        cache_conf,
        db_conf,
        factory,
        RetryPolicy::default(),
        &ThreadSleeper,
    )
}

/// Builds a storage unit from configuration with an explicit retry policy.
///
/// Validation happens before any resource is acquired: a batch larger than the
/// cache capacity fails immediately, then the cache is built, and only then is
/// the persister created.
pub fn new_storage_unit_from_conf_with_retry(
    cache_conf: &CacheConfig,
    db_conf: &DbConfig,
    factory: &dyn PersisterFactory,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<StorageUnit> {
    if db_conf.max_batch_size > cache_conf.capacity as usize {
        return Err(StorageError::CacheSizeIsLowerThanBatchSize {
            batch_size: db_conf.max_batch_size,
            capacity: cache_conf.capacity,
        });
    }

    let cacher = new_cache(cache_conf)?;
    let persister = create_db_with_retry(factory, &db_conf.file_path, policy, sleeper)?;

    info!(
        cache = %cache_conf,
        db_type = %db_conf.db_type,
        path = %db_conf.file_path,
        "storage unit created"
    );

    Ok(new_storage_unit(cacher, persister))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheType, LruCache};
    use crate::persister::{DbPersisterFactory, DbType, MemoryDb};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Memory persister whose writes and close can be made to fail.
    #[derive(Default)]
    struct FaultyDb {
        db: MemoryDb,
        fail_puts: AtomicBool,
        fail_close: AtomicBool,
    }

    impl Persister for Arc<FaultyDb> {
        fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
            if self.fail_puts.load(Ordering::SeqCst) {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.db.put(key, value)
        }

        fn get(&self, key: &[u8]) -> Result<Bytes> {
            self.db.get(key)
        }

        fn has(&self, key: &[u8]) -> Result<()> {
            self.db.has(key)
        }

        fn remove(&self, key: &[u8]) -> Result<()> {
            self.db.remove(key)
        }

        fn range_keys(&self, handler: &mut dyn FnMut(&[u8], &[u8]) -> bool) {
            self.db.range_keys(handler)
        }

        fn close(&self) -> Result<()> {
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(StorageError::Backend("close failed".into()));
            }
            self.db.close()
        }

        fn destroy(&self) -> Result<()> {
            self.db.destroy()
        }
    }

    fn lru_unit(capacity: usize) -> (StorageUnit, Arc<FaultyDb>) {
        let db = Arc::new(FaultyDb::default());
        let unit = new_storage_unit(
            Box::new(LruCache::new(capacity).unwrap()),
            Box::new(Arc::clone(&db)),
        );
        (unit, db)
    }

    fn keys(unit: &StorageUnit) -> Vec<Bytes> {
        let mut keys = unit.cached_keys();
        keys.sort();
        keys
    }

    /// Counts create calls without ever creating anything.
    struct CountingFactory(AtomicUsize);

    impl PersisterFactory for CountingFactory {
        fn create(&self, _path: &str) -> Result<Box<dyn Persister>> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(MemoryDb::new()))
        }
    }

    #[test]
    fn test_put_and_get() {
        let (unit, db) = lru_unit(10);

        unit.put(b"key", b"value").unwrap();
        assert_eq!(&unit.get(b"key").unwrap()[..], b"value");
        assert_eq!(&db.db.get(b"key").unwrap()[..], b"value");
        assert!(unit.is_cached(b"key"));
    }

    #[test]
    fn test_end_to_end_eviction_and_refill() {
        let config = UnitConfig::new(
            CacheConfig::new("e2e", CacheType::Lru).with_capacity(2),
            DbConfig::new("", DbType::MemoryDb).with_batch(1, 2),
        );
        let factory = DbPersisterFactory::new(config.db_conf.clone());
        let unit = new_storage_unit_from_unit_config(&config, &factory).unwrap();

        unit.put(b"a", b"1").unwrap();
        unit.put(b"b", b"2").unwrap();
        unit.put(b"c", b"3").unwrap();
        assert_eq!(keys(&unit), vec![Bytes::from("b"), Bytes::from("c")]);

        assert_eq!(&unit.get(b"a").unwrap()[..], b"1");
        assert_eq!(keys(&unit), vec![Bytes::from("a"), Bytes::from("c")]);
    }

    #[test]
    fn test_evicted_value_is_still_durable() {
        let (unit, _db) = lru_unit(1);

        unit.put(b"old", b"1").unwrap();
        unit.put(b"new", b"2").unwrap();
        assert!(!unit.is_cached(b"old"));

        assert_eq!(&unit.get(b"old").unwrap()[..], b"1");
        assert!(unit.is_cached(b"old"));
    }

    #[test]
    fn test_failed_durable_write_rolls_back_cache() {
        let (unit, db) = lru_unit(10);
        db.fail_puts.store(true, Ordering::SeqCst);

        assert!(matches!(unit.put(b"key", b"value"), Err(StorageError::Io(_))));
        assert!(!unit.is_cached(b"key"));
        assert!(matches!(unit.get(b"key"), Err(StorageError::KeyNotFound(_))));
    }

    #[test]
    fn test_failed_overwrite_keeps_durable_value() {
        let (unit, db) = lru_unit(10);
        unit.put(b"key", b"old").unwrap();

        db.fail_puts.store(true, Ordering::SeqCst);
        assert!(unit.put(b"key", b"new").is_err());

        assert_eq!(&unit.get(b"key").unwrap()[..], b"old");
    }

    #[test]
    fn test_has_checks_cache_then_persister() {
        let (unit, db) = lru_unit(10);

        db.db.put(b"durable-only", b"v").unwrap();
        unit.put(b"both", b"v").unwrap();

        assert!(unit.has(b"both").is_ok());
        assert!(unit.has(b"durable-only").is_ok());
        assert!(!unit.is_cached(b"durable-only"));
        assert!(matches!(unit.has(b"missing"), Err(StorageError::KeyNotFound(_))));
    }

    #[test]
    fn test_remove_from_both_media() {
        let (unit, db) = lru_unit(10);
        unit.put(b"key", b"value").unwrap();

        unit.remove(b"key").unwrap();
        assert!(!unit.is_cached(b"key"));
        assert!(db.db.get(b"key").is_err());
        assert!(unit.get(b"key").is_err());
    }

    #[test]
    fn test_range_keys_iterates_persister() {
        let (unit, db) = lru_unit(1);
        unit.put(b"a", b"1").unwrap();
        unit.put(b"b", b"2").unwrap();
        db.db.put(b"c", b"3").unwrap();

        let mut seen = Vec::new();
        unit.range_keys(&mut |key, _| {
            seen.push(key.to_vec());
            true
        });
        seen.sort();
        assert_eq!(seen, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);

        let mut visited = 0;
        unit.range_keys(&mut |_, _| {
            visited += 1;
            false
        });
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_close_clears_cache_and_surfaces_error() {
        let (unit, db) = lru_unit(10);
        unit.put(b"key", b"value").unwrap();
        db.fail_close.store(true, Ordering::SeqCst);

        assert!(matches!(unit.close(), Err(StorageError::Backend(_))));
        assert_eq!(unit.stats().cached_entries, 0);
    }

    #[test]
    fn test_destroy_unit_is_terminal() {
        let (unit, db) = lru_unit(10);
        unit.put(b"key", b"value").unwrap();

        unit.destroy_unit().unwrap();
        assert!(unit.is_destroyed());
        assert!(db.db.is_empty());

        assert!(matches!(unit.get(b"key"), Err(StorageError::UnitDestroyed)));
        assert!(matches!(unit.put(b"k", b"v"), Err(StorageError::UnitDestroyed)));
        assert!(matches!(unit.has(b"key"), Err(StorageError::UnitDestroyed)));
        assert!(matches!(unit.remove(b"key"), Err(StorageError::UnitDestroyed)));
        assert!(matches!(unit.destroy_unit(), Err(StorageError::UnitDestroyed)));

        let mut visited = 0;
        unit.range_keys(&mut |_, _| {
            visited += 1;
            true
        });
        assert_eq!(visited, 0);
    }

    #[test]
    fn test_epoch_aliases() {
        let (unit, _db) = lru_unit(10);

        unit.put_in_epoch(b"key", b"value", 7).unwrap();
        assert_eq!(&unit.get_from_epoch(b"key", 3).unwrap()[..], b"value");
        assert_eq!(&unit.search_first(b"key").unwrap()[..], b"value");

        unit.remove_from_current_epoch(b"key").unwrap();
        assert!(unit.get(b"key").is_err());

        assert!(matches!(
            unit.get_oldest_epoch(),
            Err(StorageError::OldestEpochNotAvailable)
        ));
    }

    #[test]
    fn test_get_bulk_skips_missing() {
        let (unit, _db) = lru_unit(10);
        unit.put(b"a", b"1").unwrap();
        unit.put(b"c", b"3").unwrap();

        let keys = vec![Bytes::from("a"), Bytes::from("b"), Bytes::from("c")];
        let pairs = unit.get_bulk_from_epoch(&keys, 0).unwrap();

        assert_eq!(
            pairs,
            vec![
                KeyValuePair {
                    key: Bytes::from("a"),
                    value: Bytes::from("1")
                },
                KeyValuePair {
                    key: Bytes::from("c"),
                    value: Bytes::from("3")
                },
            ]
        );
    }

    #[test]
    fn test_clear_cache_keeps_durable_data() {
        let (unit, _db) = lru_unit(10);
        unit.put(b"key", b"value").unwrap();

        unit.clear_cache();
        assert!(!unit.is_cached(b"key"));
        assert_eq!(&unit.get(b"key").unwrap()[..], b"value");
    }

    #[test]
    fn test_batch_larger_than_capacity_fails_before_create() {
        let cache_conf = CacheConfig::new("c", CacheType::Lru).with_capacity(50);
        let db_conf = DbConfig::new("", DbType::MemoryDb).with_batch(1, 100);
        let factory = CountingFactory(AtomicUsize::new(0));

        let result = new_storage_unit_from_conf(&cache_conf, &db_conf, &factory);

        assert!(matches!(
            result,
            Err(StorageError::CacheSizeIsLowerThanBatchSize {
                batch_size: 100,
                capacity: 50
            })
        ));
        assert_eq!(factory.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_invalid_cache_config_fails_before_create() {
        let cache_conf = CacheConfig::new("c", CacheType::Lru)
            .with_capacity(50)
            .with_size_in_bytes(4096);
        let db_conf = DbConfig::new("", DbType::MemoryDb).with_batch(1, 10);
        let factory = CountingFactory(AtomicUsize::new(0));

        assert!(matches!(
            new_storage_unit_from_conf(&cache_conf, &db_conf, &factory),
            Err(StorageError::LruCacheWithProvidedSize)
        ));
        assert_eq!(factory.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_from_conf_with_each_cache_type() {
        let db_conf = DbConfig::new("", DbType::MemoryDb).with_batch(1, 10);
        let factory = DbPersisterFactory::new(db_conf.clone());

        let configs = [
            CacheConfig::new("lru", CacheType::Lru).with_capacity(10),
            CacheConfig::new("size", CacheType::SizeLru)
                .with_capacity(10)
                .with_size_in_bytes(2048),
            CacheConfig::new("fifo", CacheType::FifoSharded)
                .with_capacity(16)
                .with_shards(4),
        ];

        for cache_conf in &configs {
            let unit = new_storage_unit_from_conf(cache_conf, &db_conf, &factory).unwrap();
            unit.put(b"k", b"v").unwrap();
            assert_eq!(&unit.get(b"k").unwrap()[..], b"v");
            assert_eq!(unit.stats().max_cached_entries, cache_conf.capacity as usize);
        }
    }

    /// Persister whose writes announce themselves, stall, then fail.
    struct StallingFailDb {
        db: MemoryDb,
        writing: Arc<AtomicBool>,
    }

    impl Persister for StallingFailDb {
        fn put(&self, _key: &[u8], _value: &[u8]) -> Result<()> {
            self.writing.store(true, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(200));
            Err(StorageError::Backend("write stalled and failed".into()))
        }

        fn get(&self, key: &[u8]) -> Result<Bytes> {
            self.db.get(key)
        }

        fn has(&self, key: &[u8]) -> Result<()> {
            self.db.has(key)
        }

        fn remove(&self, key: &[u8]) -> Result<()> {
            self.db.remove(key)
        }

        fn range_keys(&self, handler: &mut dyn FnMut(&[u8], &[u8]) -> bool) {
            self.db.range_keys(handler)
        }

        fn close(&self) -> Result<()> {
            self.db.close()
        }

        fn destroy(&self) -> Result<()> {
            self.db.destroy()
        }
    }

    #[test]
    fn test_get_during_failing_put_never_sees_rolled_back_value() {
        use std::thread;

        let writing = Arc::new(AtomicBool::new(false));
        let unit = Arc::new(new_storage_unit(
            Box::new(LruCache::new(10).unwrap()),
            Box::new(StallingFailDb {
                db: MemoryDb::new(),
                writing: Arc::clone(&writing),
            }),
        ));

        let writer = {
            let unit = Arc::clone(&unit);
            thread::spawn(move || unit.put(b"k", b"doomed"))
        };

        while !writing.load(Ordering::SeqCst) {
            thread::yield_now();
        }
        // The cache already holds "doomed" at this point; the read must wait
        let read = unit.get(b"k");

        assert!(matches!(read, Err(StorageError::KeyNotFound(_))));
        assert!(matches!(
            writer.join().unwrap(),
            Err(StorageError::Backend(_))
        ));
        assert!(!unit.is_cached(b"k"));
    }

    #[test]
    fn test_concurrent_access() {
        use std::thread;

        let (unit, _db) = lru_unit(64);
        let unit = Arc::new(unit);
        let mut handles = vec![];

        for i in 0..8 {
            let unit = Arc::clone(&unit);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    let value = format!("value-{}", j);
                    unit.put(key.as_bytes(), value.as_bytes()).unwrap();
                    assert_eq!(&unit.get(key.as_bytes()).unwrap()[..], value.as_bytes());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let mut total = 0;
        unit.range_keys(&mut |_, _| {
            total += 1;
            true
        });
        assert_eq!(total, 800);
        assert!(unit.stats().cached_entries <= 64);
    }
}
