//! Incoming WhatsApp message handling: filtering, unwrapping, and forwarding.

use tokio::sync::mpsc;
use tracing::{debug, info};
use waproto::whatsapp as wa;
use warden_core::message::GroupMessage;

/// Unwrap nested wrappers (device_sent, ephemeral, view_once).
pub(super) fn unwrap_message(msg: &wa::Message) -> &wa::Message {
    msg.device_sent_message
        .as_ref()
        .and_then(|d| d.message.as_deref())
        .or_else(|| {
            msg.ephemeral_message
                .as_ref()
                .and_then(|e| e.message.as_deref())
        })
        .or_else(|| {
            msg.view_once_message
                .as_ref()
                .and_then(|v| v.message.as_deref())
        })
        .unwrap_or(msg)
}

/// Text body of a message: plain text, extended text, or a media caption.
pub(super) fn extract_text(msg: &wa::Message) -> Option<String> {
    let inner = unwrap_message(msg);
    inner
        .conversation
        .as_deref()
        .or_else(|| {
            inner
                .extended_text_message
                .as_ref()
                .and_then(|e| e.text.as_deref())
        })
        .or_else(|| inner.image_message.as_ref().and_then(|m| m.caption.as_deref()))
        .or_else(|| inner.video_message.as_ref().and_then(|m| m.caption.as_deref()))
        .or_else(|| {
            inner
                .document_message
                .as_ref()
                .and_then(|m| m.caption.as_deref())
        })
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
}

/// Process an incoming WhatsApp message event.
///
/// Only group messages carrying text are forwarded; everything else
/// (direct chats, reactions, stickers, receipts) is dropped here.
pub(super) async fn handle_whatsapp_message(
    msg: wa::Message,
    info: wacore::types::message::MessageInfo,
    tx: &mpsc::Sender<GroupMessage>,
) {
    let is_group = info.source.is_group;

    debug!(
        "WA msg: is_group={}, is_from_me={}, sender={}, chat={}",
        is_group, info.source.is_from_me, info.source.sender.user, info.source.chat.user,
    );

    if !is_group {
        return;
    }

    let Some(text) = extract_text(&msg) else {
        return;
    };

    let sender_name = if info.push_name.is_empty() {
        None
    } else {
        Some(info.push_name.clone())
    };

    let incoming = GroupMessage {
        id: info.id.clone(),
        chat: info.source.chat.to_string(),
        sender: info.source.sender.to_string(),
        sender_name,
        text,
        from_me: info.source.is_from_me,
        is_group,
        timestamp: chrono::Utc::now(),
    };

    if tx.send(incoming).await.is_err() {
        info!("whatsapp channel receiver dropped");
    }
}
