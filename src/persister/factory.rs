//! Persister factories.
//!
//! A [`PersisterFactory`] turns a path into an open persister. The default
//! implementation, [`DbPersisterFactory`], dispatches on [`DbType`] to one
//! [`PersisterBuilder`] per backend kind. Only the memory backend ships with this
//! crate; disk-backed engines are injected with [`DbPersisterFactory::with_builder`].

use super::{ArgDb, DbConfig, DbType, MemoryDb, Persister};
use crate::error::{Result, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Creates persisters for a given path.
pub trait PersisterFactory: Send + Sync {
    fn create(&self, path: &str) -> Result<Box<dyn Persister>>;
}

/// Opens one kind of persister backend.
pub trait PersisterBuilder: Send + Sync {
    fn build(&self, args: &ArgDb) -> Result<Box<dyn Persister>>;
}

impl<F> PersisterBuilder for F
where
    F: Fn(&ArgDb) -> Result<Box<dyn Persister>> + Send + Sync,
{
    fn build(&self, args: &ArgDb) -> Result<Box<dyn Persister>> {
        self(args)
    }
}

/// Factory selecting the backend builder by the configured [`DbType`].
///
/// # Example
///
/// ```
/// use chainstore::persister::{DbConfig, DbPersisterFactory, DbType, PersisterFactory};
///
/// let factory = DbPersisterFactory::new(DbConfig::new("", DbType::MemoryDb));
/// let db = factory.create("ignored").unwrap();
/// db.put(b"k", b"v").unwrap();
/// ```
#[derive(Clone)]
pub struct DbPersisterFactory {
    config: DbConfig,
    builders: HashMap<DbType, Arc<dyn PersisterBuilder>>,
}

impl std::fmt::Debug for DbPersisterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbPersisterFactory")
            .field("config", &self.config)
            .field("builders", &self.builders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DbPersisterFactory {
    /// Creates a factory for `config` with the memory backend registered.
    pub fn new(config: DbConfig) -> Self {
        let mut builders: HashMap<DbType, Arc<dyn PersisterBuilder>> = HashMap::new();
        builders.insert(DbType::MemoryDb, Arc::new(build_memory_db));

        Self { config, builders }
    }

    /// Registers (or replaces) the builder used for `db_type`.
    pub fn with_builder(mut self, db_type: DbType, builder: impl PersisterBuilder + 'static) -> Self {
        self.builders.insert(db_type, Arc::new(builder));
        self
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
}

impl PersisterFactory for DbPersisterFactory {
    fn create(&self, path: &str) -> Result<Box<dyn Persister>> {
        let builder = self
            .builders
            .get(&self.config.db_type)
            .ok_or_else(|| StorageError::NotSupportedDbType(self.config.db_type.to_string()))?;

        let args = ArgDb::from_config(&self.config, path);
        debug!(db_type = %args.db_type, path = %args.path, "creating persister");

        builder.build(&args)
    }
}

fn build_memory_db(_args: &ArgDb) -> Result<Box<dyn Persister>> {
    Ok(Box::new(MemoryDb::new()))
}
