//! DeviceStore trait implementation for KvAuthState.
//!
//! The device record is the session credential blob: read once at startup,
//! rewritten on every credential rotation.

use async_trait::async_trait;
use tracing::debug;
use wacore::store::error::StoreError;
use wacore::store::traits::DeviceStore;
use wacore::store::Device;

use super::{keys, KvAuthState, Result};

#[async_trait]
impl DeviceStore for KvAuthState {
    async fn save(&self, device: &Device) -> Result<()> {
        // Device uses custom serde (key_pair_serde, BigArray) that requires
        // a binary format; serde_json cannot handle deserialize_bytes.
        let data =
            bincode::serialize(device).map_err(|e| StoreError::Serialization(e.to_string()))?;
        debug!("persisting WhatsApp credentials ({} bytes)", data.len());
        self.put_bytes(keys::CREDS, &data).await
    }

    async fn load(&self) -> Result<Option<Device>> {
        match self.get_bytes(keys::CREDS).await? {
            Some(data) => {
                let device = bincode::deserialize(&data)
                    .map_err(|e| StoreError::Serialization(e.to_string()))?;
                Ok(Some(device))
            }
            None => Ok(None),
        }
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.get_value(keys::CREDS).await?.is_some())
    }

    async fn create(&self) -> Result<i32> {
        // Single-device store. The Device data itself is populated during
        // pairing and stored via save().
        Ok(1)
    }
}
