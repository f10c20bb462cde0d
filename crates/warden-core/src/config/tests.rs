use super::*;

fn valid_config() -> Config {
    let mut cfg = Config::default();
    cfg.moderation.group_jid = "120363001234567890@g.us".to_string();
    cfg
}

#[test]
fn test_defaults_match_policy() {
    let cfg = Config::default();
    assert_eq!(cfg.moderation.warn_threshold, 3);
    assert_eq!(cfg.moderation.min_delay_secs, 20);
    assert_eq!(cfg.moderation.max_delay_secs, 45);
    assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    assert_eq!(cfg.whatsapp.reconnect_delay_secs, 5);
    assert_eq!(cfg.api.port, 3000);
    assert!(!cfg.presence.messages.is_empty());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let toml_str = r#"
        [moderation]
        group_jid = "120363001234567890@g.us"
        warn_threshold = 5

        [store]
        backend = "rest"
        url = "https://example.supabase.co"
        api_key = "secret"
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.moderation.warn_threshold, 5);
    assert_eq!(cfg.moderation.min_delay_secs, 20);
    assert_eq!(cfg.store.backend, StoreBackend::Rest);
    assert_eq!(cfg.warden.data_dir, "~/.warden");
    assert!(cfg.presence.enabled);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let cfg = load("/nonexistent/__warden_config__.toml").unwrap();
    assert_eq!(cfg.moderation.warn_threshold, 3);
}

#[test]
fn test_load_rejects_malformed_toml() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "[moderation\ngroup_jid = 1").unwrap();
    let err = load(tmp.path().to_str().unwrap()).unwrap_err();
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn test_validate_requires_group() {
    let err = Config::default().validate().unwrap_err();
    assert!(err.to_string().contains("GROUP_ID"));
}

#[test]
fn test_validate_rejects_personal_jid() {
    let mut cfg = valid_config();
    cfg.moderation.group_jid = "5511999887766@s.whatsapp.net".to_string();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_threshold() {
    let mut cfg = valid_config();
    cfg.moderation.warn_threshold = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_validate_rejects_inverted_ranges() {
    let mut cfg = valid_config();
    cfg.moderation.min_delay_secs = 50;
    assert!(cfg.validate().is_err());

    let mut cfg = valid_config();
    cfg.presence.min_interval_minutes = 500;
    assert!(cfg.validate().is_err());

    // Disabled presence does not care about its range.
    cfg.presence.enabled = false;
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_validate_active_hours_format() {
    let mut cfg = valid_config();
    cfg.presence.active_start = "08:00".to_string();
    cfg.presence.active_end = "23:59".to_string();
    assert!(cfg.validate().is_ok());

    for bad in ["8:00", "08:0", "24:00", "12:60", "ab:cd", "08-00", " 08:00"] {
        let mut cfg = valid_config();
        cfg.presence.active_start = bad.to_string();
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("active_start"), "{bad}: {err}");
    }

    let mut cfg = valid_config();
    cfg.presence.active_end = "7:30".to_string();
    assert!(cfg.validate().unwrap_err().to_string().contains("active_end"));
}

#[test]
fn test_validate_rest_needs_credentials() {
    let mut cfg = valid_config();
    cfg.store.backend = StoreBackend::Rest;
    assert!(cfg.validate().is_err());
    cfg.store.url = "https://example.supabase.co".to_string();
    cfg.store.api_key = "key".to_string();
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_store_backend_from_str() {
    assert_eq!("sqlite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
    assert_eq!("Supabase".parse::<StoreBackend>().unwrap(), StoreBackend::Rest);
    assert!("mongo".parse::<StoreBackend>().is_err());
}

#[test]
fn test_shellexpand_home() {
    if let Some(home) = std::env::var_os("HOME") {
        let expanded = shellexpand("~/.warden/data");
        assert_eq!(expanded, format!("{}/.warden/data", home.to_string_lossy()));
    }
    assert_eq!(shellexpand("/abs/path"), "/abs/path");
}
