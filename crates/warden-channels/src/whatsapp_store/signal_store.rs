//! SignalStore trait implementation for KvAuthState.
//!
//! Handles identities, sessions, prekeys, signed prekeys, and sender keys.

use async_trait::async_trait;
use serde_json::json;
use wacore::store::error::db_err;
use wacore::store::traits::SignalStore;

use super::{bytes_to_value, keys, value_to_bytes, KvAuthState, Result};

#[async_trait]
impl SignalStore for KvAuthState {
    async fn put_identity(&self, address: &str, key: [u8; 32]) -> Result<()> {
        self.put_bytes(&keys::identity(address), &key).await
    }

    async fn load_identity(&self, address: &str) -> Result<Option<Vec<u8>>> {
        self.get_bytes(&keys::identity(address)).await
    }

    async fn delete_identity(&self, address: &str) -> Result<()> {
        self.remove(&keys::identity(address)).await
    }

    async fn get_session(&self, address: &str) -> Result<Option<Vec<u8>>> {
        self.get_bytes(&keys::session(address)).await
    }

    async fn put_session(&self, address: &str, session: &[u8]) -> Result<()> {
        self.put_bytes(&keys::session(address), session).await
    }

    async fn delete_session(&self, address: &str) -> Result<()> {
        self.remove(&keys::session(address)).await
    }

    async fn store_prekey(&self, id: u32, record: &[u8], uploaded: bool) -> Result<()> {
        let value = json!({
            "record": bytes_to_value(record),
            "uploaded": uploaded,
        });
        self.put_value(&keys::pre_key(id), value).await
    }

    async fn load_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        match self.get_value(&keys::pre_key(id)).await? {
            Some(v) => Ok(Some(value_to_bytes(&v["record"])?)),
            None => Ok(None),
        }
    }

    async fn remove_prekey(&self, id: u32) -> Result<()> {
        self.remove(&keys::pre_key(id)).await
    }

    async fn store_signed_prekey(&self, id: u32, record: &[u8]) -> Result<()> {
        self.put_bytes(&keys::signed_pre_key(id), record).await
    }

    async fn load_signed_prekey(&self, id: u32) -> Result<Option<Vec<u8>>> {
        self.get_bytes(&keys::signed_pre_key(id)).await
    }

    async fn load_all_signed_prekeys(&self) -> Result<Vec<(u32, Vec<u8>)>> {
        let entries = self
            .kv
            .entries_with_prefix(keys::SIGNED_PRE_KEY_PREFIX)
            .await
            .map_err(db_err)?;

        let mut out = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            if let Some(id) = keys::signed_pre_key_id(&key) {
                out.push((id, value_to_bytes(&value)?));
            }
        }
        out.sort_by_key(|(id, _)| *id);
        Ok(out)
    }

    async fn remove_signed_prekey(&self, id: u32) -> Result<()> {
        self.remove(&keys::signed_pre_key(id)).await
    }

    async fn put_sender_key(&self, address: &str, record: &[u8]) -> Result<()> {
        self.put_bytes(&keys::sender_key(address), record).await
    }

    async fn get_sender_key(&self, address: &str) -> Result<Option<Vec<u8>>> {
        self.get_bytes(&keys::sender_key(address)).await
    }

    async fn delete_sender_key(&self, address: &str) -> Result<()> {
        self.remove(&keys::sender_key(address)).await
    }
}
