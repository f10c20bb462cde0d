//! AppSyncStore trait implementation for KvAuthState.
//!
//! Handles app state sync keys, collection versions, and mutation MACs.

use async_trait::async_trait;
use serde_json::json;
use wacore::appstate::hash::HashState;
use wacore::appstate::processor::AppStateMutationMAC;
use wacore::store::error::db_err;
use wacore::store::traits::{AppStateSyncKey, AppSyncStore};

use super::{bytes_to_value, keys, ser_err, value_to_bytes, KvAuthState, Result};

#[async_trait]
impl AppSyncStore for KvAuthState {
    async fn get_sync_key(&self, key_id: &[u8]) -> Result<Option<AppStateSyncKey>> {
        let Some(v) = self.get_value(&keys::app_state_sync_key(key_id)).await? else {
            return Ok(None);
        };

        let fingerprint = if v["fingerprint"].is_null() {
            Vec::new()
        } else {
            value_to_bytes(&v["fingerprint"])?
        };

        Ok(Some(AppStateSyncKey {
            key_data: value_to_bytes(&v["key_data"])?,
            timestamp: v["timestamp"].as_i64().unwrap_or(0),
            fingerprint,
        }))
    }

    async fn set_sync_key(&self, key_id: &[u8], key: AppStateSyncKey) -> Result<()> {
        let value = json!({
            "key_data": bytes_to_value(&key.key_data),
            "timestamp": key.timestamp,
            "fingerprint": bytes_to_value(&key.fingerprint),
        });
        self.put_value(&keys::app_state_sync_key(key_id), value)
            .await
    }

    async fn get_version(&self, name: &str) -> Result<HashState> {
        match self.get_value(&keys::app_state_version(name)).await? {
            Some(v) => serde_json::from_value(v).map_err(ser_err),
            None => Ok(HashState::default()),
        }
    }

    async fn set_version(&self, name: &str, state: HashState) -> Result<()> {
        let value = serde_json::to_value(&state).map_err(ser_err)?;
        self.put_value(&keys::app_state_version(name), value).await
    }

    async fn put_mutation_macs(
        &self,
        name: &str,
        version: u64,
        mutations: &[AppStateMutationMAC],
    ) -> Result<()> {
        let entries: Vec<(String, serde_json::Value)> = mutations
            .iter()
            .map(|m| {
                (
                    keys::mutation_mac(name, &m.index_mac),
                    json!({
                        "version": version,
                        "value_mac": bytes_to_value(&m.value_mac),
                    }),
                )
            })
            .collect();
        self.kv.set_many(&entries).await.map_err(db_err)
    }

    async fn get_mutation_mac(&self, name: &str, index_mac: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.get_value(&keys::mutation_mac(name, index_mac)).await? {
            Some(v) => Ok(Some(value_to_bytes(&v["value_mac"])?)),
            None => Ok(None),
        }
    }

    async fn delete_mutation_macs(&self, name: &str, index_macs: &[Vec<u8>]) -> Result<()> {
        let mac_keys: Vec<String> = index_macs
            .iter()
            .map(|mac| keys::mutation_mac(name, mac))
            .collect();
        self.kv.delete_many(&mac_keys).await.map_err(db_err)
    }
}
