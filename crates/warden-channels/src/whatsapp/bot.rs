//! Bot lifecycle: building, running, and reconnecting the WhatsApp bot.

use super::events::handle_whatsapp_message;
use super::qr::generate_qr_terminal;
use super::{RunningBot, WhatsAppChannel};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use wacore::types::events::Event;
use warden_core::{
    error::WardenError,
    message::{ConnectionState, GroupMessage},
};
use whatsapp_rust::bot::Bot;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;

/// Whether a `Disconnected` event should schedule a reconnect.
///
/// Retired bots were closed on purpose and logged-out sessions must pair again.
pub(super) fn reconnect_after_drop(retired: bool, state: ConnectionState) -> bool {
    !retired && state != ConnectionState::LoggedOut
}

impl WhatsAppChannel {
    /// Start the bot and the reconnect supervisor.
    ///
    /// Returns the stream of group messages. Reconnects keep feeding the
    /// same receiver.
    pub async fn start(self: &Arc<Self>) -> Result<mpsc::Receiver<GroupMessage>, WardenError> {
        let (tx, rx) = mpsc::channel(64);
        *self.msg_tx.lock().await = Some(tx.clone());
        self.build_and_run_bot(tx).await?;
        self.spawn_reconnect_supervisor().await;
        info!("WhatsApp channel started");
        Ok(rx)
    }

    /// Stop the bot and the supervisor. The persisted session is kept.
    pub async fn stop(&self) {
        if let Some(handle) = self.supervisor.lock().await.take() {
            handle.abort();
        }
        self.teardown_bot().await;
        *self.state.lock().await = ConnectionState::Disconnected;
        info!("WhatsApp channel stopped");
    }

    /// Close the current bot's socket, then stop its task.
    ///
    /// Two clients must never hold the same device session at once, or the
    /// server replaces one stream with the other.
    async fn teardown_bot(&self) {
        *self.client.lock().await = None;
        if let Some(bot) = self.running.lock().await.take() {
            bot.retired.store(true, Ordering::SeqCst);
            bot.client.disconnect().await;
            bot.task.abort();
        }
    }

    /// Tear down the current bot and build a fresh one on the saved session.
    async fn reconnect(&self) -> Result<(), WardenError> {
        self.teardown_bot().await;
        *self.state.lock().await = ConnectionState::Starting;

        let tx = self
            .msg_tx
            .lock()
            .await
            .clone()
            .ok_or_else(|| WardenError::Channel("WhatsApp not started yet".into()))?;

        self.build_and_run_bot(tx).await
    }

    async fn spawn_reconnect_supervisor(self: &Arc<Self>) {
        let Some(mut rx) = self.reconnect_rx.lock().await.take() else {
            return;
        };
        let channel = Arc::clone(self);
        let delay = Duration::from_secs(self.config.reconnect_delay_secs);

        let handle = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(delay).await;
                // Collapse signals that piled up during the delay.
                while rx.try_recv().is_ok() {}

                match channel.connection_state().await {
                    ConnectionState::Connected | ConnectionState::LoggedOut => continue,
                    _ => {}
                }

                info!("reconnecting to WhatsApp");
                if let Err(e) = channel.reconnect().await {
                    error!("whatsapp reconnect failed: {e}");
                    *channel.state.lock().await = ConnectionState::Disconnected;
                    let _ = channel.reconnect_tx.try_send(());
                }
            }
        });
        *self.supervisor.lock().await = Some(handle);
    }

    /// Build a WhatsApp bot with the event handler and run it in the background.
    ///
    /// Shared by `start()` and `reconnect()`. The event handler
    /// updates the same `Arc`-wrapped fields regardless of which bot is running.
    pub(super) async fn build_and_run_bot(
        &self,
        tx: mpsc::Sender<GroupMessage>,
    ) -> Result<(), WardenError> {
        let backend = Arc::new(self.auth.clone());
        let resuming = self.auth.has_credentials().await.unwrap_or(false);
        info!(
            "WhatsApp bot building ({})...",
            if resuming { "saved session" } else { "new pairing" }
        );

        let client_handle = self.client.clone();
        let client_for_event = client_handle.clone();
        let state_handle = self.state.clone();
        let last_qr_handle = self.last_qr.clone();
        let reconnect_tx = self.reconnect_tx.clone();
        let auth = self.auth.clone();
        let retired = Arc::new(AtomicBool::new(false));
        let retired_for_event = retired.clone();

        let mut bot = Bot::builder()
            .with_backend(backend)
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .with_device_props(
                Some(self.config.device_name.clone()),
                None,
                Some(waproto::whatsapp::device_props::PlatformType::Desktop),
            )
            .on_event(move |event, client| {
                let tx = tx.clone();
                let client_store = client_for_event.clone();
                let state = state_handle.clone();
                let last_qr_buf = last_qr_handle.clone();
                let reconnect = reconnect_tx.clone();
                let auth = auth.clone();
                let retired = retired_for_event.clone();
                async move {
                    match event {
                        Event::PairingQrCode { code, .. } => {
                            info!("WhatsApp QR code generated (scan to pair)");
                            debug!("QR data: {code}");
                            match generate_qr_terminal(&code) {
                                Ok(qr) => println!("\n{qr}"),
                                Err(e) => warn!("{e}"),
                            }
                            *last_qr_buf.lock().await = Some(code);
                            *state.lock().await = ConnectionState::AwaitingScan;
                        }
                        Event::PairSuccess(_) => {
                            info!("WhatsApp pairing successful!");
                        }
                        Event::Connected(_) => {
                            info!("WhatsApp connected");
                            *client_store.lock().await = Some(client);
                            // Session is valid, no more QR needed.
                            *last_qr_buf.lock().await = None;
                            *state.lock().await = ConnectionState::Connected;
                        }
                        Event::Disconnected(_) => {
                            let mut current = state.lock().await;
                            if !reconnect_after_drop(retired.load(Ordering::SeqCst), *current) {
                                return;
                            }
                            warn!("WhatsApp disconnected, reconnect scheduled");
                            *current = ConnectionState::Disconnected;
                            drop(current);
                            *client_store.lock().await = None;
                            let _ = reconnect.try_send(());
                        }
                        Event::LoggedOut(_) => {
                            warn!("WhatsApp logged out, session invalidated");
                            *state.lock().await = ConnectionState::LoggedOut;
                            *client_store.lock().await = None;
                            *last_qr_buf.lock().await = None;
                            if let Err(e) = auth.reset().await {
                                error!("failed to wipe WhatsApp session: {e}");
                            }
                        }
                        Event::Message(msg, info) => {
                            handle_whatsapp_message(*msg, info, &tx).await;
                        }
                        _ => {}
                    }
                }
            })
            .build()
            .await
            .map_err(|e| WardenError::Channel(format!("whatsapp bot build failed: {e}")))?;

        // Reconnects go through the supervisor with the configured fixed delay.
        let client = bot.client();
        client.enable_auto_reconnect.store(false, Ordering::Relaxed);

        // Store client reference immediately so sends work once connected.
        *client_handle.lock().await = Some(client.clone());

        // Run bot in background.
        let task = bot
            .run()
            .await
            .map_err(|e| WardenError::Channel(format!("whatsapp bot run failed: {e}")))?;
        *self.running.lock().await = Some(RunningBot {
            client,
            task,
            retired,
        });

        info!("WhatsApp bot started");
        Ok(())
    }
}
