//! Form-progress configuration parsed from defaults or environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! A `ProgressManager` owns exactly one `FormProgressConfig`. Partial updates
//! go through `FormProgressConfigUpdate` so the manager can decide whether the
//! active adapter must be rebuilt.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RETENTION_DAYS: u32 = 7;
/// Retention below one day is raised to one day.
pub const MIN_RETENTION_DAYS: u32 = 1;
pub const DEFAULT_LOCAL_DIR: &str = ".form-progress";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_QUOTA_BYTES: u64 = 5 * 1024 * 1024;

// =============================================================================
// STORAGE KIND
// =============================================================================

/// Backend selector.
///
/// Parsing never fails: unrecognized names select `LocalStorage`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StorageKind {
    #[default]
    LocalStorage,
    SessionStorage,
    Server,
    /// Declared but not implemented; selecting it is a configuration error.
    IndexedDb,
}

impl StorageKind {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "sessionStorage" => Self::SessionStorage,
            "server" => Self::Server,
            "indexedDB" => Self::IndexedDb,
            _ => Self::LocalStorage,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LocalStorage => "localStorage",
            Self::SessionStorage => "sessionStorage",
            Self::Server => "server",
            Self::IndexedDb => "indexedDB",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for StorageKind {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<StorageKind> for String {
    fn from(kind: StorageKind) -> Self {
        kind.as_str().to_string()
    }
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormProgressConfig {
    /// When false, save and load are no-ops.
    pub enabled: bool,
    pub storage: StorageKind,
    /// Used only to compute `expires_at`. At least `MIN_RETENTION_DAYS`
    /// wherever records are built.
    pub retention_days: u32,
    /// Directory backing the local area.
    pub local_dir: PathBuf,
    /// Base URL of the remote progress service.
    pub server_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Size limit shared by the local and session areas.
    pub quota_bytes: u64,
}

impl Default for FormProgressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage: StorageKind::LocalStorage,
            retention_days: DEFAULT_RETENTION_DAYS,
            local_dir: PathBuf::from(DEFAULT_LOCAL_DIR),
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

impl FormProgressConfig {
    /// Build config from environment variables, falling back to defaults.
    ///
    /// - `FORM_PROGRESS_ENABLED`: `true` (default) or `false`
    /// - `FORM_PROGRESS_STORAGE`: `localStorage` (default), `sessionStorage`, `server`, `indexedDB`
    /// - `FORM_PROGRESS_RETENTION_DAYS`: default 7, minimum 1
    /// - `FORM_PROGRESS_LOCAL_DIR`: default `.form-progress`
    /// - `FORM_PROGRESS_SERVER_URL`: default `http://localhost:3000`
    /// - `FORM_PROGRESS_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FORM_PROGRESS_CONNECT_TIMEOUT_SECS`: default 10
    /// - `FORM_PROGRESS_QUOTA_BYTES`: default 5 MiB
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_parse("FORM_PROGRESS_ENABLED", defaults.enabled),
            storage: std::env::var("FORM_PROGRESS_STORAGE")
                .map(StorageKind::from)
                .unwrap_or(defaults.storage),
            retention_days: env_parse("FORM_PROGRESS_RETENTION_DAYS", defaults.retention_days).max(MIN_RETENTION_DAYS),
            local_dir: std::env::var("FORM_PROGRESS_LOCAL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_dir),
            server_url: std::env::var("FORM_PROGRESS_SERVER_URL")
                .unwrap_or(defaults.server_url)
                .trim_end_matches('/')
                .to_string(),
            request_timeout_secs: env_parse("FORM_PROGRESS_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
            connect_timeout_secs: env_parse("FORM_PROGRESS_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs),
            quota_bytes: env_parse("FORM_PROGRESS_QUOTA_BYTES", defaults.quota_bytes),
        }
    }

    /// Shallow merge: each supplied field replaces the current value.
    #[must_use]
    pub fn merged(&self, update: FormProgressConfigUpdate) -> Self {
        Self {
            enabled: update.enabled.unwrap_or(self.enabled),
            storage: update.storage.unwrap_or(self.storage),
            retention_days: update.retention_days.unwrap_or(self.retention_days).max(MIN_RETENTION_DAYS),
            local_dir: update.local_dir.unwrap_or_else(|| self.local_dir.clone()),
            server_url: update.server_url.unwrap_or_else(|| self.server_url.clone()),
            request_timeout_secs: update.request_timeout_secs.unwrap_or(self.request_timeout_secs),
            connect_timeout_secs: update.connect_timeout_secs.unwrap_or(self.connect_timeout_secs),
            quota_bytes: update.quota_bytes.unwrap_or(self.quota_bytes),
        }
    }

    /// Whether `other` needs a different adapter instance than `self`.
    #[must_use]
    pub fn adapter_differs(&self, other: &Self) -> bool {
        self.storage != other.storage
            || self.local_dir != other.local_dir
            || self.server_url != other.server_url
            || self.request_timeout_secs != other.request_timeout_secs
            || self.connect_timeout_secs != other.connect_timeout_secs
            || self.quota_bytes != other.quota_bytes
    }
}

/// Partial configuration; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormProgressConfigUpdate {
    pub enabled: Option<bool>,
    pub storage: Option<StorageKind>,
    pub retention_days: Option<u32>,
    pub local_dir: Option<PathBuf>,
    pub server_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub quota_bytes: Option<u64>,
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
