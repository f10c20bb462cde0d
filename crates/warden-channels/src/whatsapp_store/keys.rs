//! Key layout: `{category}-{id}`.

/// Device credential record.
pub const CREDS: &str = "creds";

pub const SIGNED_PRE_KEY_PREFIX: &str = "signed-pre-key-";
pub const LID_MAPPING_PREFIX: &str = "lid-mapping-";

pub fn identity(address: &str) -> String {
    format!("identity-{address}")
}

pub fn session(address: &str) -> String {
    format!("session-{address}")
}

pub fn pre_key(id: u32) -> String {
    format!("pre-key-{id}")
}

pub fn signed_pre_key(id: u32) -> String {
    format!("{SIGNED_PRE_KEY_PREFIX}{id}")
}

pub fn sender_key(address: &str) -> String {
    format!("sender-key-{address}")
}

pub fn app_state_sync_key(key_id: &[u8]) -> String {
    format!("app-state-sync-key-{}", hex::encode(key_id))
}

pub fn app_state_version(collection: &str) -> String {
    format!("app-state-version-{collection}")
}

pub fn mutation_mac(collection: &str, index_mac: &[u8]) -> String {
    format!("mutation-mac-{collection}-{}", hex::encode(index_mac))
}

pub fn skdm_recipients(group_jid: &str) -> String {
    format!("skdm-{group_jid}")
}

pub fn lid_mapping(lid: &str) -> String {
    format!("{LID_MAPPING_PREFIX}{lid}")
}

pub fn pn_mapping(phone: &str) -> String {
    format!("pn-mapping-{phone}")
}

pub fn base_key(address: &str, message_id: &str) -> String {
    format!("base-key-{address}-{message_id}")
}

pub fn device_list(user: &str) -> String {
    format!("device-list-{user}")
}

pub fn forget_sender_key(group_jid: &str) -> String {
    format!("forget-sender-key-{group_jid}")
}

/// Parse the numeric id out of a `signed-pre-key-{id}` key.
pub fn signed_pre_key_id(key: &str) -> Option<u32> {
    key.strip_prefix(SIGNED_PRE_KEY_PREFIX)?.parse().ok()
}
