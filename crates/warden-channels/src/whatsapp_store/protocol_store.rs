//! ProtocolStore trait implementation for KvAuthState.
//!
//! Handles SKDM recipients, LID/PN mappings, base keys, device lists,
//! and forget-sender-key marks.

use async_trait::async_trait;
use serde_json::{json, Value};
use wacore::store::error::db_err;
use wacore::store::traits::{DeviceListRecord, LidPnMappingEntry, ProtocolStore};

use super::{bytes_to_value, keys, ser_err, value_to_bytes, KvAuthState, Result};

fn lid_entry_to_value(entry: &LidPnMappingEntry) -> Value {
    json!({
        "lid": entry.lid,
        "phone_number": entry.phone_number,
        "created_at": entry.created_at,
        "updated_at": entry.updated_at,
        "learning_source": entry.learning_source,
    })
}

fn value_to_lid_entry(v: &Value) -> Option<LidPnMappingEntry> {
    Some(LidPnMappingEntry {
        lid: v["lid"].as_str()?.to_string(),
        phone_number: v["phone_number"].as_str()?.to_string(),
        created_at: v["created_at"].as_i64().unwrap_or(0),
        updated_at: v["updated_at"].as_i64().unwrap_or(0),
        learning_source: v["learning_source"].as_str().unwrap_or("").to_string(),
    })
}

#[async_trait]
impl ProtocolStore for KvAuthState {
    async fn get_skdm_recipients(&self, group_jid: &str) -> Result<Vec<String>> {
        self.get_string_list(&keys::skdm_recipients(group_jid))
            .await
    }

    async fn add_skdm_recipients(&self, group_jid: &str, device_jids: &[String]) -> Result<()> {
        let key = keys::skdm_recipients(group_jid);
        let mut recipients = self.get_string_list(&key).await?;
        let before = recipients.len();
        for device in device_jids {
            if !recipients.contains(device) {
                recipients.push(device.clone());
            }
        }
        if recipients.len() == before {
            return Ok(());
        }
        self.put_value(&key, json!(recipients)).await
    }

    async fn clear_skdm_recipients(&self, group_jid: &str) -> Result<()> {
        self.remove(&keys::skdm_recipients(group_jid)).await
    }

    async fn get_lid_mapping(&self, lid: &str) -> Result<Option<LidPnMappingEntry>> {
        Ok(self
            .get_value(&keys::lid_mapping(lid))
            .await?
            .as_ref()
            .and_then(value_to_lid_entry))
    }

    async fn get_pn_mapping(&self, phone: &str) -> Result<Option<LidPnMappingEntry>> {
        let lid = match self.get_value(&keys::pn_mapping(phone)).await? {
            Some(Value::String(lid)) => lid,
            _ => return Ok(None),
        };
        self.get_lid_mapping(&lid).await
    }

    async fn put_lid_mapping(&self, entry: &LidPnMappingEntry) -> Result<()> {
        let entries = vec![
            (keys::lid_mapping(&entry.lid), lid_entry_to_value(entry)),
            (keys::pn_mapping(&entry.phone_number), json!(entry.lid)),
        ];
        self.kv.set_many(&entries).await.map_err(db_err)
    }

    async fn get_all_lid_mappings(&self) -> Result<Vec<LidPnMappingEntry>> {
        let entries = self
            .kv
            .entries_with_prefix(keys::LID_MAPPING_PREFIX)
            .await
            .map_err(db_err)?;
        Ok(entries
            .iter()
            .filter_map(|(_, v)| value_to_lid_entry(v))
            .collect())
    }

    async fn save_base_key(&self, address: &str, message_id: &str, base_key: &[u8]) -> Result<()> {
        self.put_value(&keys::base_key(address, message_id), bytes_to_value(base_key))
            .await
    }

    async fn has_same_base_key(
        &self,
        address: &str,
        message_id: &str,
        current_base_key: &[u8],
    ) -> Result<bool> {
        match self.get_value(&keys::base_key(address, message_id)).await? {
            Some(v) => Ok(value_to_bytes(&v)? == current_base_key),
            None => Ok(false),
        }
    }

    async fn delete_base_key(&self, address: &str, message_id: &str) -> Result<()> {
        self.remove(&keys::base_key(address, message_id)).await
    }

    async fn update_device_list(&self, record: DeviceListRecord) -> Result<()> {
        let value = serde_json::to_value(&record).map_err(ser_err)?;
        self.put_value(&keys::device_list(&record.user), value).await
    }

    async fn get_devices(&self, user: &str) -> Result<Option<DeviceListRecord>> {
        match self.get_value(&keys::device_list(user)).await? {
            Some(v) => Ok(Some(serde_json::from_value(v).map_err(ser_err)?)),
            None => Ok(None),
        }
    }

    async fn mark_forget_sender_key(&self, group_jid: &str, participant: &str) -> Result<()> {
        let key = keys::forget_sender_key(group_jid);
        let mut marks = self.get_string_list(&key).await?;
        if marks.iter().any(|p| p == participant) {
            return Ok(());
        }
        marks.push(participant.to_string());
        self.put_value(&key, json!(marks)).await
    }

    async fn consume_forget_marks(&self, group_jid: &str) -> Result<Vec<String>> {
        let key = keys::forget_sender_key(group_jid);
        let marks = self.get_string_list(&key).await?;
        if !marks.is_empty() {
            self.remove(&key).await?;
        }
        Ok(marks)
    }
}
