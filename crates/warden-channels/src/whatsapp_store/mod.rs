//! Key-value auth-state adapter for `whatsapp-rust`.
//!
//! Implements the `Backend` trait (SignalStore + AppSyncStore + ProtocolStore + DeviceStore)
//! on top of any [`KeyValueStore`], so the session can live in a local SQLite file
//! or a hosted table. Every record is one JSON value under a `{category}-{id}` key;
//! the device credential record lives under `creds`. Byte payloads are base64 strings.

mod app_sync_store;
mod device_store;
mod protocol_store;
mod signal_store;

pub(crate) mod keys;


use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use wacore::store::error::{db_err, StoreError};
use warden_core::{error::WardenError, traits::KeyValueStore};

type Result<T> = wacore::store::error::Result<T>;

/// Auth state persisted through a [`KeyValueStore`].
#[derive(Clone)]
pub struct KvAuthState {
    kv: Arc<dyn KeyValueStore>,
}

impl KvAuthState {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Whether a paired device credential record exists.
    pub async fn has_credentials(&self) -> std::result::Result<bool, WardenError> {
        Ok(self.kv.get(keys::CREDS).await?.is_some())
    }

    /// Wipe the whole session. The next start pairs from scratch.
    pub async fn reset(&self) -> std::result::Result<(), WardenError> {
        self.kv.clear().await?;
        info!("WhatsApp session wiped");
        Ok(())
    }

    async fn get_value(&self, key: &str) -> Result<Option<Value>> {
        self.kv.get(key).await.map_err(db_err)
    }

    async fn put_value(&self, key: &str, value: Value) -> Result<()> {
        self.kv.set(key, &value).await.map_err(db_err)
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.kv.delete(key).await.map_err(db_err)
    }

    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.get_value(key)
            .await?
            .map(|v| value_to_bytes(&v))
            .transpose()
    }

    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.put_value(key, bytes_to_value(bytes)).await
    }

    /// Read a JSON array of strings; missing key = empty list.
    async fn get_string_list(&self, key: &str) -> Result<Vec<String>> {
        match self.get_value(key).await? {
            Some(v) => serde_json::from_value(v).map_err(ser_err),
            None => Ok(Vec::new()),
        }
    }
}

pub(crate) fn bytes_to_value(bytes: &[u8]) -> Value {
    Value::String(BASE64.encode(bytes))
}

pub(crate) fn value_to_bytes(value: &Value) -> Result<Vec<u8>> {
    let s = value
        .as_str()
        .ok_or_else(|| StoreError::Serialization("expected base64 string".to_string()))?;
    BASE64
        .decode(s)
        .map_err(|e| StoreError::Serialization(format!("invalid base64: {e}")))
}

pub(crate) fn ser_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Serialization(e.to_string())
}
