use crate::{error::WardenError, message::GroupMessage, warning::WarningRecord};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Group messaging client used by the moderator.
///
/// The WhatsApp channel implements this; tests substitute a recording mock.
#[async_trait]
pub trait GroupClient: Send + Sync {
    /// Send a text message to a chat JID. Returns the sent message ID.
    async fn send_text(&self, chat: &str, text: &str) -> Result<String, WardenError>;

    /// Delete (revoke for everyone) a message posted in a group.
    async fn delete_message(&self, message: &GroupMessage) -> Result<(), WardenError>;

    /// Remove a participant from a group.
    async fn remove_participant(&self, group: &str, participant: &str)
        -> Result<(), WardenError>;

    /// Whether the client currently holds a live connection.
    async fn is_connected(&self) -> bool;
}

/// Persistent per-user warning counters.
#[async_trait]
pub trait WarningStore: Send + Sync {
    async fn get_warning(&self, user_id: &str) -> Result<Option<WarningRecord>, WardenError>;

    /// Insert or replace the record for `record.user_id`.
    async fn save_warning(&self, record: &WarningRecord) -> Result<(), WardenError>;

    async fn delete_warning(&self, user_id: &str) -> Result<(), WardenError>;
}

/// Flat key-value store holding JSON values.
///
/// Backs the WhatsApp auth state: the credential record under `creds` and
/// per-key cryptographic material under `{category}-{id}`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, WardenError>;

    /// Fetch several keys in one round trip. Missing keys are absent from the map.
    async fn get_many(&self, keys: &[String]) -> Result<HashMap<String, Value>, WardenError>;

    async fn set(&self, key: &str, value: &Value) -> Result<(), WardenError>;

    async fn set_many(&self, entries: &[(String, Value)]) -> Result<(), WardenError>;

    async fn delete(&self, key: &str) -> Result<(), WardenError>;

    async fn delete_many(&self, keys: &[String]) -> Result<(), WardenError>;

    /// All entries whose key starts with `prefix`, ordered by key.
    async fn entries_with_prefix(&self, prefix: &str)
        -> Result<Vec<(String, Value)>, WardenError>;

    /// Remove every key.
    async fn clear(&self) -> Result<(), WardenError>;
}
