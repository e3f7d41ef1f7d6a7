//! Progress manager: the caller-facing entry point.
//!
//! DESIGN
//! ======
//! The manager owns its configuration and exactly one adapter built from it.
//! `update_config` takes `&mut self`, so an adapter can never be swapped out
//! from under an in-flight operation on the same manager.
//!
//! ERROR HANDLING
//! ==============
//! Writes (`save`, `delete`, `clear`, `purge`) log and return failures.
//! `load_progress` logs and returns `None`: a failed read looks the same as
//! nothing saved. There are no retries here; retry policy belongs to callers.

use tracing::{debug, error, info, warn};

use crate::config::{FormProgressConfig, FormProgressConfigUpdate, StorageKind};
use crate::progress::{self, FormData, FormProgress, NewProgress, now_ms, progress_key};
use crate::storage::{ProgressError, ProgressStorage, SessionArea, build_adapter};

pub struct ProgressManager {
    config: FormProgressConfig,
    session_area: SessionArea,
    adapter: Box<dyn ProgressStorage>,
}

impl ProgressManager {
    /// Build a manager with a private session area.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Configuration` when the configured storage
    /// cannot be built (e.g. `indexedDB`).
    pub fn new(config: FormProgressConfig) -> Result<Self, ProgressError> {
        Self::with_session_area(config, SessionArea::new())
    }

    /// Build a manager whose session variant uses `session_area`.
    ///
    /// # Errors
    ///
    /// Same as [`ProgressManager::new`].
    pub fn with_session_area(config: FormProgressConfig, session_area: SessionArea) -> Result<Self, ProgressError> {
        let adapter = build_adapter(&config, &session_area)?;
        info!(storage = %config.storage, enabled = config.enabled, "form progress manager ready");
        Ok(Self { config, session_area, adapter })
    }

    #[must_use]
    pub fn config(&self) -> &FormProgressConfig {
        &self.config
    }

    /// The storage kind the bound adapter was built for.
    #[must_use]
    pub fn active_storage(&self) -> StorageKind {
        self.config.storage
    }

    #[must_use]
    pub fn generate_session_id() -> String {
        progress::generate_session_id()
    }

    #[must_use]
    pub fn completion_percentage(form_data: &FormData, total_fields: usize) -> u8 {
        progress::completion_percentage(form_data, total_fields)
    }

    /// Build a record stamped with the current time and configured retention.
    #[must_use]
    pub fn create_progress(&self, input: NewProgress) -> FormProgress {
        progress::build_progress(input, self.config.retention_days, now_ms())
    }

    /// Persist `record` under its `(form_id, session_id)` key.
    ///
    /// Does nothing when disabled.
    ///
    /// # Errors
    ///
    /// Returns the adapter's failure after logging it.
    pub async fn save_progress(&self, record: &FormProgress) -> Result<(), ProgressError> {
        if !self.config.enabled {
            return Ok(());
        }
        let key = progress_key(&record.form_id, &record.session_id);
        match self.adapter.save(&key, record).await {
            Ok(()) => {
                debug!(%key, completion = record.completion_percentage, "form progress saved");
                Ok(())
            }
            Err(e) => {
                error!(%key, error = %e, "failed to save form progress");
                Err(e.into())
            }
        }
    }

    /// Load the record for `(form_id, session_id)`.
    ///
    /// Returns `None` when disabled, when nothing is stored, and when the
    /// adapter fails.
    pub async fn load_progress(&self, form_id: &str, session_id: &str) -> Option<FormProgress> {
        if !self.config.enabled {
            return None;
        }
        let key = progress_key(form_id, session_id);
        match self.adapter.load(&key).await {
            Ok(record) => record,
            Err(e) => {
                warn!(%key, error = %e, "failed to load form progress");
                None
            }
        }
    }

    /// Remove the record for `(form_id, session_id)`, even when disabled.
    ///
    /// # Errors
    ///
    /// Returns the adapter's failure after logging it.
    pub async fn delete_progress(&self, form_id: &str, session_id: &str) -> Result<(), ProgressError> {
        let key = progress_key(form_id, session_id);
        self.adapter.delete(&key).await.map_err(|e| {
            error!(%key, error = %e, "failed to delete form progress");
            ProgressError::from(e)
        })
    }

    /// Remove every record in the active adapter, even when disabled.
    ///
    /// # Errors
    ///
    /// Returns the adapter's failure after logging it.
    pub async fn clear_all_progress(&self) -> Result<(), ProgressError> {
        self.adapter.clear().await.map_err(|e| {
            error!(storage = %self.config.storage, error = %e, "failed to clear form progress");
            ProgressError::from(e)
        })
    }

    /// Remove records that are stale now. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns the adapter's failure after logging it.
    pub async fn purge_expired(&self) -> Result<usize, ProgressError> {
        match self.adapter.purge_expired(now_ms()).await {
            Ok(removed) => {
                debug!(storage = %self.config.storage, removed, "expired form progress purged");
                Ok(removed)
            }
            Err(e) => {
                error!(storage = %self.config.storage, error = %e, "failed to purge form progress");
                Err(e.into())
            }
        }
    }

    /// Merge `update` into the configuration, rebuilding the adapter when
    /// the storage selection or its settings change.
    ///
    /// On error nothing changes: the previous configuration and adapter stay
    /// bound.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Configuration` when the new storage cannot be
    /// built.
    pub fn update_config(&mut self, update: FormProgressConfigUpdate) -> Result<(), ProgressError> {
        let next = self.config.merged(update);
        if self.config.adapter_differs(&next) {
            let adapter = build_adapter(&next, &self.session_area)?;
            info!(from = %self.config.storage, to = %next.storage, "form progress storage rebuilt");
            self.adapter = adapter;
        }
        self.config = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
