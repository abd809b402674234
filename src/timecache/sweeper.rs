//! Background Expiry Sweeper
//!
//! A time cache removes expired entries lazily, on lookup. Entries that are
//! never looked up again would stay in memory forever, so an owner can run this
//! sweeper to remove them periodically ("active expiry").
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Sleeps for the current interval
//! 2. Calls [`TimeCacher::sweep`]
//! 3. Logs how many entries were removed
//!
//! ## Adaptive Frequency
//!
//! When a large fraction of the tracked entries expired, the interval halves
//! (down to `min_interval`). When nothing expired, it doubles (up to
//! `max_interval`).

use super::TimeCacher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Initial interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If more than this fraction of entries expired, speed up
    pub speedup_threshold: f64,

    /// If less than this fraction of entries expired, slow down
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
        }
    }
}

impl ExpiryConfig {
    /// Computes the interval following a sweep that removed `expired` of
    /// `tracked` entries.
    fn next_interval(&self, current: Duration, expired: usize, tracked: usize) -> Duration {
        if tracked == 0 {
            return current;
        }

        let expiry_rate = expired as f64 / tracked as f64;
        if expiry_rate > self.speedup_threshold {
            (current / 2).max(self.min_interval)
        } else if expiry_rate < self.slowdown_threshold && expired == 0 {
            (current * 2).min(self.max_interval)
        } else {
            current
        }
    }
}

/// A handle to a running sweeper. Dropping it stops the task.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Spawns the sweeper on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(cache: Arc<dyn TimeCacher>, config: ExpiryConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(sweeper_loop(cache, config, shutdown_rx));

        info!("Time cache sweeper started");

        Self { shutdown_tx }
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        debug!("Time cache sweeper stopped");
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn sweeper_loop(
    cache: Arc<dyn TimeCacher>,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Time cache sweeper received shutdown signal");
                    return;
                }
            }
        }

        let tracked = cache.len();
        let expired = cache.sweep();

        let next_interval = config.next_interval(current_interval, expired, tracked);
        if next_interval != current_interval {
            trace!(
                expired = expired,
                tracked = tracked,
                new_interval_ms = next_interval.as_millis(),
                "Sweep interval adjusted"
            );
            current_interval = next_interval;
        }

        if expired > 0 {
            debug!(
                expired = expired,
                remaining = cache.len(),
                "Expired time cache entries removed"
            );
        }
    }
}

/// Starts a sweeper with the default configuration.
pub fn start_expiry_sweeper(cache: Arc<dyn TimeCacher>) -> ExpirySweeper {
    ExpirySweeper::start(cache, ExpiryConfig::default())
}
