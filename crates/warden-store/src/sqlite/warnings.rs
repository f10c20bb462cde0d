//! `WarningStore` over the `warnings` table.

use super::SqliteStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use warden_core::{error::WardenError, traits::WarningStore, warning::WarningRecord};

fn parse_ts(raw: &str) -> Result<DateTime<Utc>, WardenError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WardenError::Store(format!("bad timestamp '{raw}' in warnings: {e}")))
}

#[async_trait]
impl WarningStore for SqliteStore {
    async fn get_warning(&self, user_id: &str) -> Result<Option<WarningRecord>, WardenError> {
        let row: Option<(i64, String, String)> = sqlx::query_as(
            "SELECT warn_count, created_at, updated_at FROM warnings WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WardenError::Store(format!("failed to read warning: {e}")))?;

        let Some((warn_count, created_at, updated_at)) = row else {
            return Ok(None);
        };

        Ok(Some(WarningRecord {
            user_id: user_id.to_string(),
            warn_count: u32::try_from(warn_count).map_err(|_| {
                WardenError::Store(format!(
                    "corrupt warn_count {warn_count} for {user_id}"
                ))
            })?,
            created_at: parse_ts(&created_at)?,
            updated_at: parse_ts(&updated_at)?,
        }))
    }

    async fn save_warning(&self, record: &WarningRecord) -> Result<(), WardenError> {
        sqlx::query(
            "INSERT INTO warnings (user_id, warn_count, created_at, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET \
                warn_count = excluded.warn_count, \
                updated_at = excluded.updated_at",
        )
        .bind(&record.user_id)
        .bind(i64::from(record.warn_count))
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| WardenError::Store(format!("failed to save warning: {e}")))?;
        Ok(())
    }

    async fn delete_warning(&self, user_id: &str) -> Result<(), WardenError> {
        sqlx::query("DELETE FROM warnings WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| WardenError::Store(format!("failed to delete warning: {e}")))?;
        Ok(())
    }
}
