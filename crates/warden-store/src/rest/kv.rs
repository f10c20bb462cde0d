//! `KeyValueStore` over the remote `auth_sessions` table.

use super::{eq_filter, in_filter, prefix_filter, RestStore, SESSIONS_TABLE};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use warden_core::{error::WardenError, traits::KeyValueStore};

/// PostgREST caps the URL length; batch `in.(...)` filters below this.
const MAX_KEYS_PER_REQUEST: usize = 100;

#[derive(Serialize, Deserialize)]
pub(crate) struct SessionRow {
    pub key: String,
    pub value: Value,
}

impl RestStore {
    async fn fetch_rows(&self, query: &str, what: &str) -> Result<Vec<SessionRow>, WardenError> {
        let url = self.table_url(SESSIONS_TABLE, query);
        let resp = self.send(self.request(Method::GET, &url), what).await?;
        resp.json()
            .await
            .map_err(|e| WardenError::Store(format!("{what}: failed to parse response: {e}")))
    }

    async fn upsert_rows(&self, rows: &[SessionRow], what: &str) -> Result<(), WardenError> {
        let url = self.table_url(SESSIONS_TABLE, "");
        let builder = self
            .request(Method::POST, &url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        self.send(builder, what).await?;
        Ok(())
    }

    async fn delete_where(&self, query: &str, what: &str) -> Result<(), WardenError> {
        let url = self.table_url(SESSIONS_TABLE, query);
        self.send(self.request(Method::DELETE, &url), what).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for RestStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, WardenError> {
        let query = format!("select=key,value&{}", eq_filter("key", key));
        let rows = self.fetch_rows(&query, "auth_sessions get").await?;
        Ok(rows.into_iter().next().map(|r| r.value))
    }

    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Value>, WardenError> {
        let mut out = HashMap::with_capacity(keys.len());
        for chunk in keys.chunks(MAX_KEYS_PER_REQUEST) {
            let query = format!("select=key,value&{}", in_filter("key", chunk));
            for row in self.fetch_rows(&query, "auth_sessions get_many").await? {
                out.insert(row.key, row.value);
            }
        }
        Ok(out)
    }

    async fn set(&self, key: &str, value: &Value) -> Result<(), WardenError> {
        let row = SessionRow {
            key: key.to_string(),
            value: value.clone(),
        };
        self.upsert_rows(std::slice::from_ref(&row), "auth_sessions set")
            .await
    }

    async fn set_many(&self, entries: &[(String, Value)]) -> Result<(), WardenError> {
        if entries.is_empty() {
            return Ok(());
        }
        let rows: Vec<SessionRow> = entries
            .iter()
            .map(|(key, value)| SessionRow {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();
        self.upsert_rows(&rows, "auth_sessions set_many").await
    }

    async fn delete(&self, key: &str) -> Result<(), WardenError> {
        self.delete_where(&eq_filter("key", key), "auth_sessions delete")
            .await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), WardenError> {
        for chunk in keys.chunks(MAX_KEYS_PER_REQUEST) {
            self.delete_where(&in_filter("key", chunk), "auth_sessions delete_many")
                .await?;
        }
        Ok(())
    }

    async fn entries_with_prefix(
        &self,
        prefix: &str,
    ) -> Result<Vec<(String, Value)>, WardenError> {
        let query = format!(
            "select=key,value&{}&order=key.asc",
            prefix_filter("key", prefix)
        );
        let rows = self.fetch_rows(&query, "auth_sessions prefix scan").await?;
        Ok(rows.into_iter().map(|r| (r.key, r.value)).collect())
    }

    async fn clear(&self) -> Result<(), WardenError> {
        // PostgREST refuses an unfiltered DELETE.
        self.delete_where("key=not.is.null", "auth_sessions clear")
            .await
    }
}
