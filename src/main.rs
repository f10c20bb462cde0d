mod api;
mod gateway;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warden_channels::{whatsapp::WhatsAppChannel, whatsapp_store::KvAuthState};
use warden_core::config::{self, Config, StoreBackend, WardenConfig};
use warden_core::shellexpand;

#[derive(Parser)]
#[command(name = "warden", version, about = "Warden: WhatsApp group link moderator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    #[command(flatten)]
    overrides: Overrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to WhatsApp and start moderating.
    Start,
    /// Show configuration and stored session status.
    Status,
    /// Wipe the stored WhatsApp session so the next start pairs again.
    ResetSession,
}

/// Environment/flag overrides applied on top of `config.toml`.
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Hosted REST backend URL.
    #[arg(long, env = "SUPABASE_URL", global = true, hide_env_values = true)]
    supabase_url: Option<String>,

    /// Hosted REST backend service key.
    #[arg(long, env = "SUPABASE_KEY", global = true, hide_env_values = true)]
    supabase_key: Option<String>,

    /// Target group JID.
    #[arg(long, env = "GROUP_ID", global = true)]
    group_id: Option<String>,

    /// HTTP server port.
    #[arg(long, env = "PORT", global = true)]
    port: Option<u16>,

    /// Storage backend: sqlite or rest.
    #[arg(long, env = "WARDEN_STORE", global = true)]
    store: Option<StoreBackend>,
}

impl Overrides {
    fn apply(self, cfg: &mut Config) {
        let has_rest_credentials = self.supabase_url.is_some() && self.supabase_key.is_some();
        if let Some(url) = self.supabase_url {
            cfg.store.url = url;
        }
        if let Some(key) = self.supabase_key {
            cfg.store.api_key = key;
        }
        if let Some(group) = self.group_id {
            cfg.moderation.group_jid = group;
        }
        if let Some(port) = self.port {
            cfg.api.port = port;
        }
        match self.store {
            Some(backend) => cfg.store.backend = backend,
            // Hosted credentials without an explicit choice mean the hosted backend.
            None if has_rest_credentials => cfg.store.backend = StoreBackend::Rest,
            None => {}
        }
    }
}

/// Console plus a daily-rolling file under `{data_dir}/logs/`.
fn init_logging(cfg: &WardenConfig) -> anyhow::Result<WorkerGuard> {
    let log_dir = PathBuf::from(shellexpand(&cfg.data_dir)).join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "warden.log"));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level)))
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}

fn load_config(path: &str, overrides: Overrides) -> anyhow::Result<Config> {
    let mut cfg = config::load(path)?;
    overrides.apply(&mut cfg);
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(&cli.config, cli.overrides)?;

    match cli.command {
        Commands::Start => {
            cfg.validate()?;
            let _log_guard = init_logging(&cfg.warden)?;

            let stores = warden_store::open(&cfg.store).await?;
            let auth = KvAuthState::new(stores.sessions.clone());
            let channel = Arc::new(WhatsAppChannel::new(cfg.whatsapp.clone(), auth));

            println!("Warden: starting moderator...");
            let gw = Arc::new(gateway::Gateway::new(cfg, channel, stores.warnings));
            gw.run().await?;
        }
        Commands::Status => {
            println!("Warden status\n");
            println!("Config: {}", cli.config);
            println!(
                "Group: {}",
                if cfg.moderation.group_jid.is_empty() {
                    "(not set)"
                } else {
                    cfg.moderation.group_jid.as_str()
                }
            );
            println!(
                "Policy: {} warnings, {}-{}s delay",
                cfg.moderation.warn_threshold,
                cfg.moderation.min_delay_secs,
                cfg.moderation.max_delay_secs
            );
            match cfg.store.backend {
                StoreBackend::Sqlite => println!("Store: sqlite ({})", cfg.store.db_path),
                StoreBackend::Rest => println!("Store: rest ({})", cfg.store.url),
            }
            if let Err(e) = cfg.validate() {
                println!("\n  config: {e}");
                return Ok(());
            }
            println!();

            let stores = warden_store::open(&cfg.store).await?;
            let paired = KvAuthState::new(stores.sessions).has_credentials().await?;
            println!(
                "  whatsapp session: {}",
                if paired { "paired" } else { "not paired" }
            );
        }
        Commands::ResetSession => {
            let stores = warden_store::open(&cfg.store).await?;
            KvAuthState::new(stores.sessions).reset().await?;
            println!("WhatsApp session wiped. Run `warden start` to pair again.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut cfg = Config::default();
        Overrides {
            group_id: Some("120363001234567890@g.us".to_string()),
            port: Some(8080),
            ..Default::default()
        }
        .apply(&mut cfg);

        assert_eq!(cfg.moderation.group_jid, "120363001234567890@g.us");
        assert_eq!(cfg.api.port, 8080);
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn test_rest_credentials_select_rest_backend() {
        let mut cfg = Config::default();
        Overrides {
            supabase_url: Some("https://xyz.supabase.co".to_string()),
            supabase_key: Some("service-key".to_string()),
            ..Default::default()
        }
        .apply(&mut cfg);

        assert_eq!(cfg.store.backend, StoreBackend::Rest);
        assert_eq!(cfg.store.url, "https://xyz.supabase.co");
        assert_eq!(cfg.store.api_key, "service-key");
    }

    #[test]
    fn test_explicit_store_wins_over_credentials() {
        let mut cfg = Config::default();
        Overrides {
            supabase_url: Some("https://xyz.supabase.co".to_string()),
            supabase_key: Some("k".to_string()),
            store: Some(StoreBackend::Sqlite),
            ..Default::default()
        }
        .apply(&mut cfg);
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["warden", "reset-session", "--config", "x.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::ResetSession));
        assert_eq!(cli.config, "x.toml");
    }
}
