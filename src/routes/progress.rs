//! Form-progress routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::progress::{FormProgress, now_ms};
use crate::state::AppState;
use crate::storage::StorageError;

#[derive(Debug, Default, Deserialize)]
pub struct PurgeParams {
    /// Caller clock in epoch milliseconds; the server clock when absent.
    pub now: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PurgeResult {
    pub removed: usize,
}

pub(crate) fn storage_error_to_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::QuotaExceeded { .. } => StatusCode::INSUFFICIENT_STORAGE,
        StorageError::Serialization(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn fail(op: &'static str, key: &str, err: &StorageError) -> StatusCode {
    error!(op, %key, error = %err, "progress storage failed");
    storage_error_to_status(err)
}

/// `PUT /api/form-progress/{key}`: store a record, replacing any existing one.
pub async fn put_progress(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(record): Json<FormProgress>,
) -> Result<StatusCode, StatusCode> {
    state
        .store
        .save(&key, &record)
        .await
        .map_err(|e| fail("save", &key, &e))?;
    debug!(%key, completion = record.completion_percentage, "progress saved");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/form-progress/{key}`: fetch a record or 404.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<FormProgress>, StatusCode> {
    state
        .store
        .load(&key)
        .await
        .map_err(|e| fail("load", &key, &e))?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// `DELETE /api/form-progress/{key}`
pub async fn delete_progress(State(state): State<AppState>, Path(key): Path<String>) -> Result<StatusCode, StatusCode> {
    state
        .store
        .delete(&key)
        .await
        .map_err(|e| fail("delete", &key, &e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/form-progress`: remove every record.
pub async fn clear_progress(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    state.store.clear().await.map_err(|e| fail("clear", "*", &e))?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/form-progress/purge?now=<ms>`: drop stale records.
pub async fn purge_expired(
    State(state): State<AppState>,
    Query(params): Query<PurgeParams>,
) -> Result<Json<PurgeResult>, StatusCode> {
    let now = params.now.unwrap_or_else(now_ms);
    let removed = state
        .store
        .purge_expired(now)
        .await
        .map_err(|e| fail("purge", "*", &e))?;
    Ok(Json(PurgeResult { removed }))
}

#[cfg(test)]
#[path = "progress_test.rs"]
mod tests;
