//! Event loop: feeds channel messages to the moderator and runs the
//! background tasks (presence, HTTP API).

mod links;
mod moderation;
mod presence;

pub use moderation::{Moderator, Outcome};

use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use warden_channels::whatsapp::WhatsAppChannel;
use warden_core::{
    config::{ApiConfig, Config, PresenceConfig},
    traits::{GroupClient, WarningStore},
};

/// The main Warden gateway.
pub struct Gateway {
    channel: Arc<WhatsAppChannel>,
    moderator: Arc<Moderator>,
    name: String,
    group: String,
    presence_config: PresenceConfig,
    api_config: ApiConfig,
    uptime: Instant,
}

impl Gateway {
    pub fn new(
        config: Config,
        channel: Arc<WhatsAppChannel>,
        warnings: Arc<dyn WarningStore>,
    ) -> Self {
        let client: Arc<dyn GroupClient> = channel.clone();
        Self {
            moderator: Arc::new(Moderator::new(client, warnings, config.moderation.clone())),
            channel,
            name: config.warden.name,
            group: config.moderation.group_jid,
            presence_config: config.presence,
            api_config: config.api,
            uptime: Instant::now(),
        }
    }

    /// Run the main event loop until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!("Warden gateway starting (group {})", self.group);

        let mut rx = self.channel.start().await?;

        // Spawn presence loop.
        let presence_handle =
            if self.presence_config.enabled && !self.presence_config.messages.is_empty() {
                let cfg = self.presence_config.clone();
                let group = self.group.clone();
                let client: Arc<dyn GroupClient> = self.channel.clone();
                Some(tokio::spawn(async move {
                    presence::presence_loop(cfg, group, client).await;
                }))
            } else {
                None
            };

        // Spawn HTTP API server.
        let api_handle = if self.api_config.enabled {
            let api_cfg = self.api_config.clone();
            let probe: Arc<dyn crate::api::ConnectionProbe> = self.channel.clone();
            let name = self.name.clone();
            let group = self.group.clone();
            let uptime = self.uptime;
            Some(tokio::spawn(async move {
                crate::api::serve(api_cfg, probe, name, group, uptime).await;
            }))
        } else {
            None
        };

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                Some(incoming) = rx.recv() => {
                    let moderator = self.moderator.clone();
                    tokio::spawn(async move {
                        let id = incoming.id.clone();
                        let outcome = moderator.handle(incoming).await;
                        if outcome != Outcome::Ignored {
                            debug!("message {id}: {outcome:?}");
                        }
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(&presence_handle, &api_handle).await;
        Ok(())
    }

    /// Graceful shutdown: stop background tasks and the channel.
    async fn shutdown(
        &self,
        presence_handle: &Option<JoinHandle<()>>,
        api_handle: &Option<JoinHandle<()>>,
    ) {
        info!("Shutting down...");

        if let Some(h) = presence_handle {
            h.abort();
        }
        if let Some(h) = api_handle {
            h.abort();
        }

        self.channel.stop().await;
        info!("Shutdown complete.");
    }
}
