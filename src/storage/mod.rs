//! Storage adapters: one uniform contract over heterogeneous backends.
//!
//! ARCHITECTURE
//! ============
//! `ProgressStorage` is the seam between the progress manager and a storage
//! medium. The manager holds one boxed adapter, built by [`build_adapter`]
//! from the configured `StorageKind`. The HTTP routes reuse the same trait so
//! the server binary can expose any backend over the wire.
//!
//! KEYSPACE
//! ========
//! Local and session areas may be shared with unrelated data, so entries this
//! crate owns carry the `form_progress_` prefix and `clear` touches nothing
//! else.

pub mod local;
pub mod postgres;
pub mod server;
pub mod session;

use std::time::Duration;

use crate::config::{FormProgressConfig, StorageKind};
use crate::progress::FormProgress;

pub use local::LocalStorage;
pub use postgres::PostgresStorage;
pub use server::ServerStorage;
pub use session::{SessionArea, SessionStorage};

pub const KEY_PREFIX: &str = "form_progress_";

// =============================================================================
// ERRORS
// =============================================================================

/// Medium-level failures reported by adapters.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The write would exceed the area's size limit.
    #[error("storage quota exceeded: {needed} bytes needed, limit {limit}")]
    QuotaExceeded { needed: u64, limit: u64 },

    /// The record could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP request to the progress service failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The progress service returned a non-success status.
    #[error("server responded with status {status}")]
    Status { status: u16, body: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

/// Errors surfaced by the progress manager.
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// The configuration selects a backend that cannot be built.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// =============================================================================
// CONTRACT
// =============================================================================

/// Uniform save/load/delete/clear contract over one storage medium.
#[async_trait::async_trait]
pub trait ProgressStorage: Send + Sync {
    /// Persist `record` under `key`, replacing any previous value.
    async fn save(&self, key: &str, record: &FormProgress) -> Result<(), StorageError>;

    /// Return the record under `key`.
    ///
    /// Absent, undecodable, and stale records all yield `Ok(None)`; errors are
    /// reserved for faults in the medium itself.
    async fn load(&self, key: &str) -> Result<Option<FormProgress>, StorageError>;

    /// Remove the record under `key`. Succeeds when nothing was stored.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Remove every record this adapter manages.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Remove records stale at `now_ms`, returning how many were removed.
    async fn purge_expired(&self, now_ms: i64) -> Result<usize, StorageError>;
}

// =============================================================================
// FACTORY
// =============================================================================

/// Build the adapter selected by `config.storage`.
///
/// The session variant binds to `session_area` so its contents outlive
/// adapter swaps.
///
/// # Errors
///
/// Returns `ProgressError::Configuration` for `indexedDB`, which has no
/// implementation, and when the HTTP client for the server variant cannot be
/// built.
pub fn build_adapter(
    config: &FormProgressConfig,
    session_area: &SessionArea,
) -> Result<Box<dyn ProgressStorage>, ProgressError> {
    match config.storage {
        StorageKind::SessionStorage => Ok(Box::new(SessionStorage::new(session_area.clone(), config.quota_bytes))),
        StorageKind::Server => {
            let storage = ServerStorage::new(
                &config.server_url,
                Duration::from_secs(config.request_timeout_secs),
                Duration::from_secs(config.connect_timeout_secs),
            )
            .map_err(|e| ProgressError::Configuration(format!("server storage: {e}")))?;
            Ok(Box::new(storage))
        }
        StorageKind::IndexedDb => Err(ProgressError::Configuration("indexedDB storage is not implemented".into())),
        StorageKind::LocalStorage => Ok(Box::new(LocalStorage::new(config.local_dir.clone(), config.quota_bytes))),
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Prefixed entry name for `key` inside a shared area.
#[must_use]
pub(crate) fn scoped_key(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}

/// Decode a stored payload, treating garbage as absent.
pub(crate) fn decode_record(key: &str, raw: &[u8]) -> Option<FormProgress> {
    match serde_json::from_slice::<FormProgress>(raw) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!(%key, error = %e, "stored progress is not decodable; treating as absent");
            None
        }
    }
}

/// Fail when replacing `replaced` bytes with `incoming` bytes would push
/// `used` past `limit`.
pub(crate) fn check_quota(used: u64, replaced: u64, incoming: u64, limit: u64) -> Result<(), StorageError> {
    let needed = used.saturating_sub(replaced).saturating_add(incoming);
    if needed > limit {
        return Err(StorageError::QuotaExceeded { needed, limit });
    }
    Ok(())
}


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
