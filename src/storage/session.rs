//! Session-scoped storage area held in process memory.
//!
//! A `SessionArea` is the medium; `SessionStorage` is the adapter over it.
//! Cloning a `SessionArea` shares the same entries, which is how a manager
//! keeps session progress across adapter swaps.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::{KEY_PREFIX, ProgressStorage, StorageError, check_quota, decode_record, scoped_key};
use crate::progress::{FormProgress, now_ms};

/// Shared string-keyed area of serialized entries.
#[derive(Clone, Default)]
pub struct SessionArea {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionArea {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw entry. Used to seed foreign or corrupt data.
    pub async fn set_raw(&self, name: &str, value: &str) {
        self.entries.write().await.insert(name.to_string(), value.to_string());
    }

    pub async fn get_raw(&self, name: &str) -> Option<String> {
        self.entries.read().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

/// Adapter over a [`SessionArea`].
pub struct SessionStorage {
    area: SessionArea,
    quota_bytes: u64,
}

impl SessionStorage {
    #[must_use]
    pub fn new(area: SessionArea, quota_bytes: u64) -> Self {
        Self { area, quota_bytes }
    }
}

fn entry_size(name: &str, value: &str) -> u64 {
    (name.len() + value.len()) as u64
}

#[async_trait::async_trait]
impl ProgressStorage for SessionStorage {
    async fn save(&self, key: &str, record: &FormProgress) -> Result<(), StorageError> {
        let name = scoped_key(key);
        let raw = serde_json::to_string(record)?;

        let mut entries = self.area.entries.write().await;
        let used: u64 = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        let replaced = entries.get(&name).map_or(0, |v| entry_size(&name, v));
        check_quota(used, replaced, entry_size(&name, &raw), self.quota_bytes)?;

        entries.insert(name, raw);
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<FormProgress>, StorageError> {
        let name = scoped_key(key);
        // Held across the expiry check so a concurrent save is never dropped.
        let mut entries = self.area.entries.write().await;
        let Some(raw) = entries.get(&name) else {
            return Ok(None);
        };
        let Some(record) = decode_record(key, raw.as_bytes()) else {
            return Ok(None);
        };
        if record.is_expired_at(now_ms()) {
            entries.remove(&name);
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.area.entries.write().await.remove(&scoped_key(key));
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.area
            .entries
            .write()
            .await
            .retain(|name, _| !name.starts_with(KEY_PREFIX));
        Ok(())
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<usize, StorageError> {
        let mut entries = self.area.entries.write().await;
        let before = entries.len();
        entries.retain(|name, raw| {
            if !name.starts_with(KEY_PREFIX) {
                return true;
            }
            serde_json::from_str::<FormProgress>(raw).map_or(true, |record| !record.is_expired_at(now_ms))
        });
        Ok(before - entries.len())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
