//! Expiring Time Cache
//!
//! Tracks "key last seen at time T, forget it after span D". Used by higher layers
//! for deduplication, e.g. "has this peer been seen within the last minute?".
//!
//! ## Expiry
//!
//! ```text
//!   absent ──upsert──> live ──(now - T >= D)──> expired ──has / sweep──> absent
//!                       ▲  │
//!                       └──┘ upsert refreshes T and D
//! ```
//!
//! Expired entries are removed lazily when [`TimeCacher::has`] observes them, or
//! in bulk by [`TimeCacher::sweep`]. The cache has no scheduler of its own; an
//! owner that wants periodic sweeping runs an [`ExpirySweeper`].
//!
//! ## Example
//!
//! ```
//! use chainstore::timecache::{TimeCache, TimeCacher};
//! use std::time::Duration;
//!
//! let cache = TimeCache::new(Duration::from_secs(60));
//! cache.add("tx-hash").unwrap();
//! assert!(cache.has("tx-hash"));
//! assert!(!cache.has("other"));
//! ```

pub mod clock;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use sweeper::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper};

use crate::error::{Result, StorageError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Capability of a cache whose entries expire after a per-key span.
pub trait TimeCacher: Send + Sync {
    /// Records `key` with the cache's default span.
    fn add(&self, key: &str) -> Result<()>;

    /// Records or refreshes `key`, expiring `span` from now.
    fn upsert(&self, key: &str, span: Duration) -> Result<()>;

    /// Returns true iff `key` is live. Does not refresh it.
    fn has(&self, key: &str) -> bool;

    /// Removes every expired entry and returns how many were removed.
    fn sweep(&self) -> usize;

    /// Number of tracked entries, including expired ones not yet removed.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    timestamp: Instant,
    span: Duration,
}

impl Span {
    #[inline]
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) >= self.span
    }
}

/// Map-backed [`TimeCacher`].
pub struct TimeCache {
    data: RwLock<HashMap<String, Span>>,
    default_span: Duration,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TimeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeCache")
            .field("entries", &self.data.read().len())
            .field("default_span", &self.default_span)
            .finish()
    }
}

impl TimeCache {
    /// Creates a time cache reading the system clock.
    pub fn new(default_span: Duration) -> Self {
        Self::with_clock(default_span, Arc::new(SystemClock))
    }

    pub fn with_clock(default_span: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            default_span,
            clock,
        }
    }

    pub fn default_span(&self) -> Duration {
        self.default_span
    }

    /// Forgets every entry.
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl TimeCacher for TimeCache {
    fn add(&self, key: &str) -> Result<()> {
        self.upsert(key, self.default_span)
    }

    fn upsert(&self, key: &str, span: Duration) -> Result<()> {
        if key.is_empty() {
            return Err(StorageError::EmptyKey);
        }

        let timestamp = self.clock.now();
        self.data
            .write()
            .insert(key.to_string(), Span { timestamp, span });
        Ok(())
    }

    fn has(&self, key: &str) -> bool {
        let now = self.clock.now();

        // Fast path: live or absent under the shared lock
        {
            let data = self.data.read();
            match data.get(key) {
                None => return false,
                Some(entry) if !entry.is_expired(now) => return true,
                Some(_) => {}
            }
        }

        // Expired: remove it, unless refreshed in between
        let mut data = self.data.write();
        match data.get(key) {
            Some(entry) if entry.is_expired(now) => {
                data.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut data = self.data.write();
        let before = data.len();
        data.retain(|_, entry| !entry.is_expired(now));
        before - data.len()
    }

    fn len(&self) -> usize {
        self.data.read().len()
    }
}

/// Identifier of a remote peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// [`TimeCacher`] adapter keyed by [`PeerId`].
#[derive(Clone)]
pub struct PeerTimeCache {
    cache: Arc<dyn TimeCacher>,
}

impl fmt::Debug for PeerTimeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerTimeCache")
            .field("entries", &self.cache.len())
            .finish()
    }
}

impl PeerTimeCache {
    pub fn new(cache: Arc<dyn TimeCacher>) -> Self {
        Self { cache }
    }

    pub fn upsert(&self, peer: &PeerId, span: Duration) -> Result<()> {
        self.cache.upsert(peer.as_str(), span)
    }

    pub fn has(&self, peer: &PeerId) -> bool {
        self.cache.has(peer.as_str())
    }

    pub fn sweep(&self) -> usize {
        self.cache.sweep()
    }
}
