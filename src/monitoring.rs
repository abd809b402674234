//! Cache creation monitoring.
//!
//! Every cache built through [`crate::cache::new_cache`] reports its configured byte
//! capacity here. The hook only accumulates a process-wide counter and logs it, so it
//! can never fail or affect storage correctness.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static CUMULATED_SIZE_IN_BYTES: AtomicU64 = AtomicU64::new(0);

/// Adds the cache's byte capacity to the global cumulated size and logs it.
pub fn monitor_new_cache(name: &str, size_in_bytes: u64) {
    let cumulated = CUMULATED_SIZE_IN_BYTES.fetch_add(size_in_bytes, Ordering::Relaxed)
        + size_in_bytes;

    debug!(
        name = name,
        capacity = %convert_bytes(size_in_bytes),
        cumulated = %convert_bytes(cumulated),
        "MonitorNewCache"
    );
}

/// Returns the sum of the byte capacities of all caches created so far.
pub fn cumulated_size_in_bytes() -> u64 {
    CUMULATED_SIZE_IN_BYTES.load(Ordering::Relaxed)
}

/// Renders a byte count with a binary unit suffix (`B`, `KB`, `MB`, `GB`).
pub fn convert_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b < KB => format!("{} B", b),
        b if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.2} MB", b as f64 / MB as f64),
        b => format!("{:.2} GB", b as f64 / GB as f64),
    }
}
