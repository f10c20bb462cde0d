//! GroupClient implementation for WhatsApp.

use super::admin;
use super::send::{parse_jid, retry_send, revoke_edit, revoke_message, text_message, with_retry};
use super::WhatsAppChannel;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;
use warden_core::{error::WardenError, message::GroupMessage, traits::GroupClient};
use whatsapp_rust::client::Client;

impl WhatsAppChannel {
    /// Clone the live client out of the lock so retries don't hold it.
    async fn live_client(&self) -> Result<Arc<Client>, WardenError> {
        self.client
            .lock()
            .await
            .clone()
            .ok_or_else(|| WardenError::Channel("whatsapp client not connected".into()))
    }
}

#[async_trait]
impl GroupClient for WhatsAppChannel {
    async fn send_text(&self, chat: &str, text: &str) -> Result<String, WardenError> {
        let client = self.live_client().await?;
        let jid = parse_jid(chat)?;
        retry_send(&client, &jid, text_message(text)).await
    }

    async fn delete_message(&self, message: &GroupMessage) -> Result<(), WardenError> {
        let client = self.live_client().await?;
        let jid = parse_jid(&message.chat)?;
        let revoke = revoke_message(message);
        let revoke_id = if message.is_group {
            let edit = revoke_edit(message);
            with_retry("revoke", || {
                admin::send_group_edit(&client, &jid, &revoke, edit.clone())
            })
            .await?
        } else {
            retry_send(&client, &jid, revoke).await?
        };
        debug!("revoked {} in {} ({revoke_id})", message.id, message.chat);
        Ok(())
    }

    async fn remove_participant(&self, group: &str, participant: &str) -> Result<(), WardenError> {
        let client = self.live_client().await?;
        let group_jid = parse_jid(group)?;
        let participant_jid = parse_jid(participant)?;
        admin::remove_participant(&client, &group_jid, &participant_jid).await
    }

    async fn is_connected(&self) -> bool {
        WhatsAppChannel::is_connected(self).await
    }
}
