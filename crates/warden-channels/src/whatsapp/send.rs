//! Message sending utilities: message builders and retry logic.

use std::future::Future;
use tracing::{error, warn};
use wacore::types::message::EditAttribute;
use wacore_binary::jid::Jid;
use waproto::whatsapp::{self as wa, message};
use warden_core::{error::WardenError, message::GroupMessage};
use whatsapp_rust::client::Client;

/// Retry delays for exponential backoff: 500ms, 1s, 2s.
pub(super) const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 2000];

/// Run `op` with retry and exponential backoff.
///
/// Attempts up to 3 times with delays of 500ms, 1s, 2s between retries.
pub(super) async fn with_retry<T, E, F, Fut>(what: &str, mut op: F) -> Result<T, WardenError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut last_err = None;

    for (attempt, delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let attempt_num = attempt + 1;
                if attempt_num < RETRY_DELAYS_MS.len() {
                    warn!(
                        "whatsapp {what} attempt {attempt_num}/{} failed: {e}, retrying in {delay_ms}ms",
                        RETRY_DELAYS_MS.len()
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(*delay_ms)).await;
                } else {
                    error!(
                        "whatsapp {what} attempt {attempt_num}/{} failed: {e}, giving up",
                        RETRY_DELAYS_MS.len()
                    );
                }
                last_err = Some(e.to_string());
            }
        }
    }

    Err(WardenError::Channel(format!(
        "whatsapp {what} failed after {} attempts: {}",
        RETRY_DELAYS_MS.len(),
        last_err.unwrap_or_default()
    )))
}

/// Send a WhatsApp message with retry.
pub(super) async fn retry_send(
    client: &Client,
    jid: &Jid,
    msg: wa::Message,
) -> Result<String, WardenError> {
    with_retry("send", || client.send_message(jid.clone(), msg.clone())).await
}

pub(super) fn text_message(text: &str) -> wa::Message {
    wa::Message {
        conversation: Some(text.to_string()),
        ..Default::default()
    }
}

/// Build a "delete for everyone" protocol message targeting `target`.
///
/// In groups the key must name the original author as `participant`,
/// otherwise the server treats it as a revoke of our own message.
pub(super) fn revoke_message(target: &GroupMessage) -> wa::Message {
    let participant = if target.is_group && !target.from_me {
        Some(target.sender.clone())
    } else {
        None
    };

    wa::Message {
        protocol_message: Some(Box::new(message::ProtocolMessage {
            key: Some(wa::MessageKey {
                remote_jid: Some(target.chat.clone()),
                from_me: Some(target.from_me),
                id: Some(target.id.clone()),
                participant,
                ..Default::default()
            }),
            r#type: Some(message::protocol_message::Type::Revoke as i32),
            ..Default::default()
        })),
        ..Default::default()
    }
}

/// Stanza `edit` attribute for a revoke of `target`.
///
/// Deleting another member's message is an admin revoke; the server
/// ignores the protocol message without it.
pub(super) fn revoke_edit(target: &GroupMessage) -> EditAttribute {
    if target.from_me {
        EditAttribute::SenderRevoke
    } else {
        EditAttribute::AdminRevoke
    }
}

pub(super) fn parse_jid(jid_str: &str) -> Result<Jid, WardenError> {
    jid_str
        .parse()
        .map_err(|e| WardenError::Channel(format!("invalid whatsapp JID '{jid_str}': {e}")))
}
