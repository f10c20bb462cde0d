mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::WardenError;
use defaults::*;

/// Top-level Warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub warden: WardenConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
    #[serde(default)]
    pub presence: PresenceConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// General bot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Where sessions and warnings are persisted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Local SQLite file.
    #[default]
    Sqlite,
    /// Hosted PostgREST endpoint (e.g. Supabase).
    Rest,
}

impl std::str::FromStr for StoreBackend {
    type Err = WardenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "local" => Ok(Self::Sqlite),
            "rest" | "supabase" => Ok(Self::Rest),
            other => Err(WardenError::Config(format!(
                "unknown store backend '{other}' (expected sqlite or rest)"
            ))),
        }
    }
}

/// Storage config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,
    /// SQLite database path (sqlite backend).
    #[serde(default = "default_db_path")]
    pub db_path: String,
    /// Base URL of the hosted project, e.g. `https://xyz.supabase.co` (rest backend).
    #[serde(default)]
    pub url: String,
    /// Service key sent as `apikey` and bearer token (rest backend).
    #[serde(default)]
    pub api_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            db_path: default_db_path(),
            url: String::new(),
            api_key: String::new(),
        }
    }
}

/// Link moderation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Target group JID (`...@g.us`).
    #[serde(default)]
    pub group_jid: String,
    /// Offense count at which the sender is removed.
    #[serde(default = "default_warn_threshold")]
    pub warn_threshold: u32,
    #[serde(default = "default_min_delay_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: u64,
    /// Phone numbers never moderated (admins, the owner).
    #[serde(default)]
    pub exempt_users: Vec<String>,
    /// Placeholders: `{user}`, `{count}`, `{threshold}`.
    #[serde(default = "default_warning_template")]
    pub warning_template: String,
    #[serde(default = "default_ban_template")]
    pub ban_template: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            group_jid: String::new(),
            warn_threshold: default_warn_threshold(),
            min_delay_secs: default_min_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            exempt_users: Vec::new(),
            warning_template: default_warning_template(),
            ban_template: default_ban_template(),
        }
    }
}

/// Filler messages posted to look like a human member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_min_interval_minutes")]
    pub min_interval_minutes: u64,
    #[serde(default = "default_max_interval_minutes")]
    pub max_interval_minutes: u64,
    /// Active hours start (e.g. "08:00"). Empty = always active.
    #[serde(default)]
    pub active_start: String,
    /// Active hours end (e.g. "22:00"). Empty = always active.
    #[serde(default)]
    pub active_end: String,
    #[serde(default = "default_presence_messages")]
    pub messages: Vec<String>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_minutes: default_min_interval_minutes(),
            max_interval_minutes: default_max_interval_minutes(),
            active_start: String::new(),
            active_end: String::new(),
            messages: default_presence_messages(),
        }
    }
}

/// WhatsApp channel config.
///
/// Pairing is done by scanning a QR code (like WhatsApp Web).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Device name shown under "Linked devices" on the phone.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Fixed delay before reconnecting after a dropped connection.
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }
}

/// HTTP status/QR server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_api_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

impl Config {
    /// Reject configurations the bot cannot run with.
    pub fn validate(&self) -> Result<(), WardenError> {
        let m = &self.moderation;
        if m.group_jid.trim().is_empty() {
            return Err(WardenError::Config(
                "moderation.group_jid is empty. Set it in config.toml or the GROUP_ID env var."
                    .into(),
            ));
        }
        if !m.group_jid.ends_with("@g.us") {
            return Err(WardenError::Config(format!(
                "moderation.group_jid '{}' is not a group JID (must end with @g.us)",
                m.group_jid
            )));
        }
        if m.warn_threshold == 0 {
            return Err(WardenError::Config(
                "moderation.warn_threshold must be at least 1".into(),
            ));
        }
        if m.min_delay_secs > m.max_delay_secs {
            return Err(WardenError::Config(format!(
                "moderation delay range is inverted ({} > {})",
                m.min_delay_secs, m.max_delay_secs
            )));
        }

        let p = &self.presence;
        if p.enabled && p.min_interval_minutes > p.max_interval_minutes {
            return Err(WardenError::Config(format!(
                "presence interval range is inverted ({} > {})",
                p.min_interval_minutes, p.max_interval_minutes
            )));
        }
        if p.enabled && p.min_interval_minutes == 0 {
            return Err(WardenError::Config(
                "presence.min_interval_minutes must be at least 1".into(),
            ));
        }

        for (field, value) in [("active_start", &p.active_start), ("active_end", &p.active_end)] {
            if !value.is_empty() && !is_hhmm(value) {
                return Err(WardenError::Config(format!(
                    "presence.{field} '{value}' must be zero-padded HH:MM (e.g. 08:00)"
                )));
            }
        }

        if self.store.backend == StoreBackend::Rest
            && (self.store.url.is_empty() || self.store.api_key.is_empty())
        {
            return Err(WardenError::Config(
                "rest store needs store.url and store.api_key (SUPABASE_URL / SUPABASE_KEY)"
                    .into(),
            ));
        }
        Ok(())
    }
}

/// Zero-padded 24-hour `HH:MM`, so times compare correctly as strings.
fn is_hhmm(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    if !bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 2 || b.is_ascii_digit())
    {
        return false;
    }
    let hours = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let minutes = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    hours < 24 && minutes < 60
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, WardenError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| WardenError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| WardenError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
