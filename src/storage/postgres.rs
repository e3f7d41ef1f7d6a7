//! PostgreSQL backend for the progress service.
//!
//! The `form_progress` table is this backend's whole keyspace, so `clear`
//! truncates it. Staleness is filtered in SQL on `expires_at`.

use sqlx::{PgPool, Row};

use super::{ProgressStorage, StorageError};
use crate::progress::{FormProgress, now_ms};

pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProgressStorage for PostgresStorage {
    async fn save(&self, key: &str, record: &FormProgress) -> Result<(), StorageError> {
        let body = serde_json::to_value(record)?;
        sqlx::query(
            r"INSERT INTO form_progress (key, form_id, session_id, user_id, record, expires_at, updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, now())
              ON CONFLICT (key) DO UPDATE SET
                  form_id = EXCLUDED.form_id,
                  session_id = EXCLUDED.session_id,
                  user_id = EXCLUDED.user_id,
                  record = EXCLUDED.record,
                  expires_at = EXCLUDED.expires_at,
                  updated_at = now()",
        )
        .bind(key)
        .bind(&record.form_id)
        .bind(&record.session_id)
        .bind(record.user_id.as_deref())
        .bind(body)
        .bind(record.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<FormProgress>, StorageError> {
        let row = sqlx::query("SELECT record FROM form_progress WHERE key = $1 AND expires_at > $2")
            .bind(key)
            .bind(now_ms())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let body: serde_json::Value = row.get("record");
        match serde_json::from_value::<FormProgress>(body) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(%key, error = %e, "stored progress row is not decodable; treating as absent");
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM form_progress WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM form_progress").execute(&self.pool).await?;
        Ok(())
    }

    async fn purge_expired(&self, now_ms: i64) -> Result<usize, StorageError> {
        let result = sqlx::query("DELETE FROM form_progress WHERE expires_at <= $1")
            .bind(now_ms)
            .execute(&self.pool)
            .await?;
        Ok(usize::try_from(result.rows_affected()).unwrap_or(usize::MAX))
    }
}
