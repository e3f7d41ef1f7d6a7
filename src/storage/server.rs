//! Remote progress service client.
//!
//! Thin HTTP wrapper over the routes in `crate::routes`. Keys travel as a
//! single percent-encoded path segment; bodies are `FormProgress` JSON.

use std::time::Duration;

use reqwest::{StatusCode, Url};
use serde::Deserialize;

use super::{ProgressStorage, StorageError, decode_record};
use crate::progress::FormProgress;

const API_PATH: [&str; 2] = ["api", "form-progress"];

// =============================================================================
// CLIENT
// =============================================================================

pub struct ServerStorage {
    http: reqwest::Client,
    base: Url,
}

impl ServerStorage {
    /// # Errors
    ///
    /// Returns an error when `base_url` is not an absolute http(s) URL or the
    /// HTTP client cannot be built.
    pub fn new(base_url: &str, request_timeout: Duration, connect_timeout: Duration) -> Result<Self, StorageError> {
        let base = Url::parse(base_url).map_err(|e| StorageError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(StorageError::InvalidUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self { http, base })
    }

    fn url(&self, tail: &[&str]) -> Result<Url, StorageError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::InvalidUrl(self.base.to_string()))?
            .pop_if_empty()
            .extend(API_PATH)
            .extend(tail);
        Ok(url)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct PurgeResponse {
    removed: usize,
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StorageError::Status { status: status.as_u16(), body })
}

#[async_trait::async_trait]
impl ProgressStorage for ServerStorage {
    async fn save(&self, key: &str, record: &FormProgress) -> Result<(), StorageError> {
        let response = self.http.put(self.url(&[key])?).json(record).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<FormProgress>, StorageError> {
        let response = self.http.get(self.url(&[key])?).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = ensure_success(response).await?.bytes().await?;
        Ok(decode_record(key, &body))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self.http.delete(self.url(&[key])?).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        let response = self.http.delete(self.url(&[])?).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<usize, StorageError> {
        let url = self.url(&["purge"])?;
        let response = self.http.post(url).query(&[("now", now_ms)]).send().await?;
        let text = ensure_success(response).await?.text().await?;
        let parsed: PurgeResponse = serde_json::from_str(&text)?;
        Ok(parsed.removed)
    }
}

#[cfg(test)]
#[path = "server_test.rs"]
mod tests;
