//! Retention service: periodic removal of stale progress records.
//!
//! DESIGN
//! ======
//! A background task sweeps the store, then sleeps for the configured
//! interval. Sweep failures are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::env_parse;
use crate::progress::now_ms;
use crate::storage::{ProgressStorage, StorageError};

pub const DEFAULT_RETENTION_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Sweep interval from `RETENTION_SWEEP_INTERVAL_SECS`.
#[must_use]
pub fn sweep_interval_from_env() -> Duration {
    Duration::from_secs(env_parse("RETENTION_SWEEP_INTERVAL_SECS", DEFAULT_RETENTION_SWEEP_INTERVAL_SECS).max(1))
}

/// Run one sweep at the current time.
///
/// # Errors
///
/// Returns the store's failure.
pub async fn sweep_once(store: &dyn ProgressStorage) -> Result<usize, StorageError> {
    let removed = store.purge_expired(now_ms()).await?;
    debug!(removed, "retention sweep complete");
    Ok(removed)
}

/// Spawn the background sweep. Returns a handle for shutdown.
pub fn spawn_retention_sweep(store: Arc<dyn ProgressStorage>, interval: Duration) -> JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "retention sweep configured");
    tokio::spawn(async move {
        loop {
            if let Err(e) = sweep_once(store.as_ref()).await {
                warn!(error = %e, "retention sweep failed");
            }
            tokio::time::sleep(interval).await;
        }
    })
}

#[cfg(test)]
#[path = "retention_test.rs"]
mod tests;
