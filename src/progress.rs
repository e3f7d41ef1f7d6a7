//! Progress records: the persisted snapshot of a partially-filled form.
//!
//! DESIGN
//! ======
//! A record is keyed by `(form_id, session_id)`. Derived fields (`id`,
//! `completion_percentage`, timestamps) are computed here at construction and
//! are never accepted from callers.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::MIN_RETENTION_DAYS;

/// Field name to field value. Order is irrelevant.
pub type FormData = serde_json::Map<String, Value>;

pub const MS_PER_DAY: i64 = 86_400_000;

const SESSION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// =============================================================================
// FORM PROGRESS
// =============================================================================

/// Snapshot of one form's fill-in progress for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormProgress {
    /// Derived key, `form_id + "_" + session_id`.
    pub id: String,
    pub form_id: String,
    /// Present only when the filler is authenticated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub session_id: String,
    pub form_data: FormData,
    pub current_step: u32,
    pub total_steps: u32,
    /// Always in `0..=100`.
    pub completion_percentage: u8,
    /// Epoch milliseconds at construction.
    pub last_updated: i64,
    /// Epoch milliseconds after which the record is stale.
    pub expires_at: i64,
}

impl FormProgress {
    #[must_use]
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

// =============================================================================
// NEW PROGRESS
// =============================================================================

/// Caller input for [`build_progress`]. Derived fields are not settable.
#[derive(Debug, Clone, Default)]
pub struct NewProgress {
    pub form_id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub form_data: FormData,
    pub current_step: Option<u32>,
    pub total_steps: Option<u32>,
    /// Declared field count; defaults to the number of entries in `form_data`.
    pub total_fields: Option<usize>,
}

impl NewProgress {
    #[must_use]
    pub fn new(form_id: impl Into<String>, session_id: impl Into<String>, form_data: FormData) -> Self {
        Self { form_id: form_id.into(), session_id: session_id.into(), form_data, ..Self::default() }
    }

    #[must_use]
    pub fn steps(mut self, current_step: u32, total_steps: u32) -> Self {
        self.current_step = Some(current_step);
        self.total_steps = Some(total_steps);
        self
    }

    #[must_use]
    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    #[must_use]
    pub fn total_fields(mut self, total_fields: usize) -> Self {
        self.total_fields = Some(total_fields);
        self
    }
}

/// Build a record at time `now_ms` with the given retention window, raised to
/// at least `MIN_RETENTION_DAYS`.
#[must_use]
pub fn build_progress(input: NewProgress, retention_days: u32, now_ms: i64) -> FormProgress {
    let total_fields = input.total_fields.unwrap_or(input.form_data.len());
    let completion_percentage = completion_percentage(&input.form_data, total_fields);

    FormProgress {
        id: progress_key(&input.form_id, &input.session_id),
        form_id: input.form_id,
        user_id: input.user_id,
        session_id: input.session_id,
        form_data: input.form_data,
        current_step: input.current_step.unwrap_or(0),
        total_steps: input.total_steps.unwrap_or(1).max(1),
        completion_percentage,
        last_updated: now_ms,
        expires_at: now_ms.saturating_add(i64::from(retention_days.max(MIN_RETENTION_DAYS)) * MS_PER_DAY),
    }
}

// =============================================================================
// DERIVATIONS
// =============================================================================

/// Storage key for a `(form, session)` pair. No normalization is applied.
#[must_use]
pub fn progress_key(form_id: &str, session_id: &str) -> String {
    format!("{form_id}_{session_id}")
}

/// Whether a field value counts toward completion.
#[must_use]
pub fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Rounded percentage of filled fields out of `total_fields`.
///
/// Returns `0` when `total_fields` is zero and never exceeds `100`.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn completion_percentage(form_data: &FormData, total_fields: usize) -> u8 {
    if total_fields == 0 {
        return 0;
    }
    let filled = form_data.values().filter(|v| is_filled(v)).count();
    let ratio = filled as f64 / total_fields as f64;
    (ratio * 100.0).round().min(100.0) as u8
}

/// Generate a session id of the form `session_{epoch_ms}_{suffix}`.
///
/// Uniqueness is probabilistic: nothing checks existing storage for a clash.
#[must_use]
pub fn generate_session_id() -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SESSION_SUFFIX_LEN)
        .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
        .collect();
    format!("session_{}_{suffix}", now_ms())
}

pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "progress_test.rs"]
mod tests;
