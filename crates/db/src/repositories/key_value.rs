use chrono::Utc;
use serde_json::Value;

use super::{KeyValueStore, RepositoryError};
use crate::DbPool;

pub struct SqlKeyValueStore {
    pool: DbPool,
}

impl SqlKeyValueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl KeyValueStore for SqlKeyValueStore {
    async fn load(&self, key: &str) -> Result<Option<Value>, RepositoryError> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT value FROM key_value_store WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        raw.map(|raw| {
            serde_json::from_str(&raw).map_err(|e| RepositoryError::Decode(format!("{key}: {e}")))
        })
        .transpose()
    }

    async fn store(&self, key: &str, value: Value) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO key_value_store (key, value, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value.to_string())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM key_value_store WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
