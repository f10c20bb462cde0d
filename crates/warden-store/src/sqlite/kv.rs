//! `KeyValueStore` over the `auth_sessions` table.

use super::SqliteStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use warden_core::{error::WardenError, traits::KeyValueStore};

fn store_err(op: &str) -> impl Fn(sqlx::Error) -> WardenError + '_ {
    move |e| WardenError::Store(format!("auth_sessions {op} failed: {e}"))
}

fn decode(key: &str, raw: &str) -> Result<Value, WardenError> {
    serde_json::from_str(raw)
        .map_err(|e| WardenError::Store(format!("corrupt value for key '{key}': {e}")))
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, WardenError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM auth_sessions WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err("get"))?;
        row.map(|(raw,)| decode(key, &raw)).transpose()
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Value>, WardenError> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; keys.len()].join(", ");
        let sql = format!("SELECT key, value FROM auth_sessions WHERE key IN ({placeholders})");
        let mut query = sqlx::query_as::<_, (String, String)>(&sql);
        for key in keys {
            query = query.bind(key);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(store_err("get_many"))?;

        let mut out = HashMap::with_capacity(rows.len());
        for (key, raw) in rows {
            let value = decode(&key, &raw)?;
            out.insert(key, value);
        }
        Ok(out)
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), WardenError> {
        sqlx::query(
            "INSERT OR REPLACE INTO auth_sessions (key, value, updated_at) \
             VALUES (?, ?, datetime('now'))",
        )
        .bind(key)
        .bind(value.to_string())
        .execute(&self.pool)
        .await
        .map_err(store_err("set"))?;
        Ok(())
    }

    async fn set_many(&self, entries: &[(String, Value)]) -> Result<(), WardenError> {
        let mut tx = self.pool.begin().await.map_err(store_err("begin"))?;
        for (key, value) in entries {
            sqlx::query(
                "INSERT OR REPLACE INTO auth_sessions (key, value, updated_at) \
                 VALUES (?, ?, datetime('now'))",
            )
            .bind(key)
            .bind(value.to_string())
            .execute(&mut *tx)
            .await
            .map_err(store_err("set_many"))?;
        }
        tx.commit().await.map_err(store_err("commit"))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), WardenError> {
        sqlx::query("DELETE FROM auth_sessions WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(store_err("delete"))?;
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), WardenError> {
        let mut tx = self.pool.begin().await.map_err(store_err("begin"))?;
        for key in keys {
            sqlx::query("DELETE FROM auth_sessions WHERE key = ?")
                .bind(key)
                .execute(&mut *tx)
                .await
                .map_err(store_err("delete_many"))?;
        }
        tx.commit().await.map_err(store_err("commit"))?;
        Ok(())
    }

    async fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, Value)>, WardenError> {
        // substr() instead of LIKE: LIKE is case-insensitive and treats `_` as a wildcard.
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT key, value FROM auth_sessions \
             WHERE substr(key, 1, length(?)) = ? ORDER BY key",
        )
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err("prefix scan"))?;

        rows.into_iter()
            .map(|(key, raw)| decode(&key, &raw).map(|v| (key, v)))
            .collect()
    }

    async fn clear(&self) -> Result<(), WardenError> {
        sqlx::query("DELETE FROM auth_sessions")
            .execute(&self.pool)
            .await
            .map_err(store_err("clear"))?;
        Ok(())
    }
}
