//! Default value functions used by serde for config deserialization.

use super::StoreBackend;

pub fn default_name() -> String {
    "Warden".to_string()
}

pub fn default_data_dir() -> String {
    "~/.warden".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_store_backend() -> StoreBackend {
    StoreBackend::Sqlite
}

pub fn default_db_path() -> String {
    "~/.warden/data/warden.db".to_string()
}

pub fn default_warn_threshold() -> u32 {
    3
}

pub fn default_min_delay_secs() -> u64 {
    20
}

pub fn default_max_delay_secs() -> u64 {
    45
}

pub fn default_warning_template() -> String {
    "⚠️ {user}, links are not allowed in this group. Warning {count}/{threshold}.".to_string()
}

pub fn default_ban_template() -> String {
    "🚫 {user} reached {threshold} warnings for posting links and has been removed.".to_string()
}

pub fn default_min_interval_minutes() -> u64 {
    45
}

pub fn default_max_interval_minutes() -> u64 {
    180
}

pub fn default_presence_messages() -> Vec<String> {
    vec![
        "Good morning, everyone!".to_string(),
        "Anyone around?".to_string(),
        "Friendly reminder: no links in the group 🙂".to_string(),
        "Hope everyone is having a good day.".to_string(),
    ]
}

pub fn default_device_name() -> String {
    "Warden".to_string()
}

pub fn default_reconnect_delay_secs() -> u64 {
    5
}

pub fn default_api_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_api_port() -> u16 {
    3000
}
