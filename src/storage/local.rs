//! Persistent local area backed by a directory of JSON files.
//!
//! DESIGN
//! ======
//! Each key maps to `form_progress_<hex(key)>.json`. Hex-encoding keeps
//! arbitrary form and session ids safe as file names, and the prefix scopes
//! `clear` and quota accounting to files this crate wrote. Keys longer than
//! `MAX_HEX_KEY_BYTES` map to `form_progress_sha256-<digest>.json` instead so
//! names stay under the 255-byte file-name limit. Writes go to a temporary
//! sibling first and are renamed into place.

use std::fmt::Write;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::fs;

use super::{KEY_PREFIX, ProgressStorage, StorageError, check_quota, decode_record};
use crate::progress::{FormProgress, now_ms};

const FILE_SUFFIX: &str = ".json";
const DIGEST_MARKER: &str = "sha256-";

/// Longest key stored under its hex encoding.
pub const MAX_HEX_KEY_BYTES: usize = 100;

pub struct LocalStorage {
    dir: PathBuf,
    quota_bytes: u64,
}

impl LocalStorage {
    #[must_use]
    pub fn new(dir: PathBuf, quota_bytes: u64) -> Self {
        Self { dir, quota_bytes }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }

    /// Paths of every entry file this adapter owns. A missing directory is empty.
    async fn owned_files(&self) -> Result<Vec<PathBuf>, StorageError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(KEY_PREFIX) && name.ends_with(FILE_SUFFIX) {
                paths.push(entry.path());
            }
        }
        Ok(paths)
    }

    async fn used_bytes(&self) -> Result<u64, StorageError> {
        let mut total = 0;
        for path in self.owned_files().await? {
            total += file_len(&path).await?;
        }
        Ok(total)
    }
}

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

fn file_name(key: &str) -> String {
    if key.len() <= MAX_HEX_KEY_BYTES {
        return format!("{KEY_PREFIX}{}{FILE_SUFFIX}", bytes_to_hex(key.as_bytes()));
    }
    let digest = Sha256::digest(key.as_bytes());
    format!("{KEY_PREFIX}{DIGEST_MARKER}{}{FILE_SUFFIX}", bytes_to_hex(&digest))
}

async fn read_if_present(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remove `path` only if the record it holds right now is stale at `now_ms`.
///
/// Returns whether the file was removed. A file rewritten with a fresh record
/// since the caller last read it is left in place.
async fn remove_if_stale(path: &Path, now_ms: i64) -> Result<bool, StorageError> {
    let Some(raw) = read_if_present(path).await? else {
        return Ok(false);
    };
    let Ok(record) = serde_json::from_slice::<FormProgress>(&raw) else {
        return Ok(false);
    };
    if !record.is_expired_at(now_ms) {
        return Ok(false);
    }
    remove_if_present(path).await?;
    Ok(true)
}

async fn file_len(path: &Path) -> Result<u64, StorageError> {
    match fs::metadata(path).await {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_present(path: &Path) -> Result<(), StorageError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait::async_trait]
impl ProgressStorage for LocalStorage {
    async fn save(&self, key: &str, record: &FormProgress) -> Result<(), StorageError> {
        let raw = serde_json::to_vec(record)?;
        let path = self.path_for(key);

        let used = self.used_bytes().await?;
        let replaced = file_len(&path).await?;
        check_quota(used, replaced, raw.len() as u64, self.quota_bytes)?;

        fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &raw).await?;
        fs::rename(&tmp, &path).await?;
        tracing::debug!(%key, path = %path.display(), "local progress written");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<FormProgress>, StorageError> {
        let path = self.path_for(key);
        let Some(raw) = read_if_present(&path).await? else {
            return Ok(None);
        };
        let Some(record) = decode_record(key, &raw) else {
            return Ok(None);
        };
        let now = now_ms();
        if record.is_expired_at(now) {
            remove_if_stale(&path, now).await?;
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        remove_if_present(&self.path_for(key)).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        for path in self.owned_files().await? {
            remove_if_present(&path).await?;
        }
        Ok(())
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<usize, StorageError> {
        let mut removed = 0;
        for path in self.owned_files().await? {
            if remove_if_stale(&path, now_ms).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
#[path = "local_test.rs"]
mod tests;
