use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An incoming message observed by the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMessage {
    /// Platform message ID (needed to revoke it).
    pub id: String,
    /// Chat JID the message was posted in (e.g. `1203630...@g.us`).
    pub chat: String,
    /// Sender JID (e.g. `5511999887766@s.whatsapp.net`).
    pub sender: String,
    /// Push name of the sender, if WhatsApp provided one.
    pub sender_name: Option<String>,
    /// Text content, or the caption of a media message.
    pub text: String,
    /// Whether the bot's own account sent this message.
    #[serde(default)]
    pub from_me: bool,
    /// Whether the chat is a group.
    #[serde(default)]
    pub is_group: bool,
    pub timestamp: DateTime<Utc>,
}

impl GroupMessage {
    /// The user part of the sender JID (the phone number for `s.whatsapp.net`).
    pub fn sender_user(&self) -> &str {
        self.sender.split(['@', ':']).next().unwrap_or(&self.sender)
    }

    /// Human-readable name for templates: push name, else `@phone`.
    pub fn display_name(&self) -> String {
        match self.sender_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name.to_string(),
            _ => format!("@{}", self.sender_user()),
        }
    }
}

/// Connection lifecycle of the WhatsApp client, as shown on the status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Starting,
    /// A pairing QR code is available and waiting to be scanned.
    AwaitingScan,
    Connected,
    /// Connection dropped; a reconnect is scheduled.
    Disconnected,
    /// The phone unlinked this device. The session was wiped; no reconnect.
    LoggedOut,
}

impl ConnectionState {
    /// Stable identifier used in JSON and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::AwaitingScan => "awaiting_scan",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::LoggedOut => "logged_out",
        }
    }

    /// Short human description for the HTML status page.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Starting => "Connecting to WhatsApp...",
            Self::AwaitingScan => "Waiting for the pairing QR code to be scanned.",
            Self::Connected => "Connected and moderating.",
            Self::Disconnected => "Disconnected, reconnecting shortly.",
            Self::LoggedOut => "Logged out. Restart the bot to pair again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(sender: &str, name: Option<&str>) -> GroupMessage {
        GroupMessage {
            id: "ABC".to_string(),
            chat: "120363001234567890@g.us".to_string(),
            sender: sender.to_string(),
            sender_name: name.map(String::from),
            text: String::new(),
            from_me: false,
            is_group: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_sender_user_strips_server_and_device() {
        assert_eq!(
            msg("5511999887766@s.whatsapp.net", None).sender_user(),
            "5511999887766"
        );
        assert_eq!(
            msg("5511999887766:12@s.whatsapp.net", None).sender_user(),
            "5511999887766"
        );
    }

    #[test]
    fn test_display_name_falls_back_to_phone() {
        assert_eq!(
            msg("5511999887766@s.whatsapp.net", Some("Ana")).display_name(),
            "Ana"
        );
        assert_eq!(
            msg("5511999887766@s.whatsapp.net", Some("  ")).display_name(),
            "@5511999887766"
        );
    }

    #[test]
    fn test_connection_state_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::AwaitingScan).unwrap();
        assert_eq!(json, "\"awaiting_scan\"");
        assert_eq!(ConnectionState::LoggedOut.as_str(), "logged_out");
    }
}
