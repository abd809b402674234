//! In-memory persister.
//!
//! Backs the `MemoryDB` kind: a plain map behind a lock. Nothing survives the
//! process, which makes it the persister of choice for tests and ephemeral nodes.

use super::Persister;
use crate::error::{Result, StorageError};
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct MemoryState {
    data: HashMap<Bytes, Bytes>,
    closed: bool,
}

/// A [`Persister`] keeping everything in a `HashMap`.
///
/// Once closed or destroyed, every operation fails with [`StorageError::DbClosed`].
#[derive(Debug, Default)]
pub struct MemoryDb {
    state: RwLock<MemoryState>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pairs.
    pub fn len(&self) -> usize {
        self.state.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Persister for MemoryDb {
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        if state.closed {
            return Err(StorageError::DbClosed);
        }

        state
            .data
            .insert(Bytes::copy_from_slice(key), Bytes::copy_from_slice(value));
        Ok(())
    }

    fn get(&self, key: &[u8]) -> Result<Bytes> {
        let state = self.state.read();
        if state.closed {
            return Err(StorageError::DbClosed);
        }

        state
            .data
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::key_not_found(key))
    }

    fn has(&self, key: &[u8]) -> Result<()> {
        let state = self.state.read();
        if state.closed {
            return Err(StorageError::DbClosed);
        }

        if state.data.contains_key(key) {
            Ok(())
        } else {
            Err(StorageError::key_not_found(key))
        }
    }

    fn remove(&self, key: &[u8]) -> Result<()> {
        let mut state = self.state.write();
        if state.closed {
            return Err(StorageError::DbClosed);
        }

        state.data.remove(key);
        Ok(())
    }

    fn range_keys(&self, handler: &mut dyn FnMut(&[u8], &[u8]) -> bool) {
        // Snapshot first so the handler may call back into this persister.
        let snapshot: Vec<(Bytes, Bytes)> = {
            let state = self.state.read();
            if state.closed {
                return;
            }
            state
                .data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };

        for (key, value) in &snapshot {
            if !handler(&key[..], &value[..]) {
                break;
            }
        }
    }

    fn close(&self) -> Result<()> {
        self.state.write().closed = true;
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        let mut state = self.state.write();
        state.data.clear();
        state.closed = true;
        Ok(())
    }
}
