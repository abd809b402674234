//! Bounded retry around persister creation.
//!
//! Opening a disk-backed store can fail transiently, typically because a
//! previous process still holds its lock file while shutting down. Creation is
//! therefore retried a fixed number of times with a fixed pause in between.
//! The pause is delegated to a [`Sleeper`] so tests run without real delays.
//!
//! Worst case, the caller blocks for `(max_attempts - 1) * backoff`. There is no
//! cancellation.

use super::{Persister, PersisterFactory};
use crate::error::Result;
use std::time::Duration;
use tracing::{error, info, warn};

/// Maximum number of attempts to create a persister.
pub const MAX_RETRIES_TO_CREATE_DB: usize = 10;

/// Pause between two failed creation attempts.
pub const SLEEP_TIME_BETWEEN_CREATE_DB_RETRIES: Duration = Duration::from_secs(5);

/// Blocks the calling thread for a while.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by [`std::thread::sleep`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero behaves as one.
    pub max_attempts: usize,
    /// Pause after each failed attempt except the last.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES_TO_CREATE_DB,
            backoff: SLEEP_TIME_BETWEEN_CREATE_DB_RETRIES,
        }
    }
}

/// Creates a persister at `path`, retrying with the default policy.
pub fn create_db(factory: &dyn PersisterFactory, path: &str) -> Result<Box<dyn Persister>> {
    create_db_with_retry(factory, path, RetryPolicy::default(), &ThreadSleeper)
}

/// Creates a persister at `path`, retrying per `policy`.
///
/// Returns the first successful persister immediately. Configuration errors are
/// returned without retrying (see [`crate::error::StorageError::is_config_error`]).
/// When every attempt fails, returns the error of the last attempt.
pub fn create_db_with_retry(
    factory: &dyn PersisterFactory,
    path: &str,
    policy: RetryPolicy,
    sleeper: &dyn Sleeper,
) -> Result<Box<dyn Persister>> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match factory.create(path) {
            Ok(db) => {
                if attempt > 1 {
                    info!(path = path, attempt = attempt, "persister created after retries");
                }
                return Ok(db);
            }
            Err(err) if err.is_config_error() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                error!(
                    path = path,
                    attempts = attempt,
                    error = %err,
                    "giving up creating persister"
                );
                return Err(err);
            }
            Err(err) => {
                warn!(
                    path = path,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    error = %err,
                    "cannot create persister, retrying"
                );
                sleeper.sleep(policy.backoff);
                attempt += 1;
            }
        }
    }
}
