//! WhatsApp channel, a pure Rust implementation via `whatsapp-rust`.
//!
//! Uses the WhatsApp Web protocol (Noise handshake + Signal encryption).
//! Pairing is done by scanning a QR code, like WhatsApp Web.
//! The session lives in whatever [`KeyValueStore`](warden_core::traits::KeyValueStore)
//! backs the [`KvAuthState`].

mod admin;
mod bot;
mod client;
mod events;
mod qr;
mod send;


pub use qr::generate_qr_data_uri;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use warden_core::config::WhatsAppConfig;
use warden_core::message::{ConnectionState, GroupMessage};
use whatsapp_rust::client::Client;

use crate::whatsapp_store::KvAuthState;

/// A built bot: its client and the task driving it.
pub(super) struct RunningBot {
    pub(super) client: Arc<Client>,
    pub(super) task: JoinHandle<()>,
    /// Set before an intentional teardown so its disconnect is not
    /// reported as a dropped connection.
    pub(super) retired: Arc<AtomicBool>,
}

/// WhatsApp channel using the WhatsApp Web protocol.
pub struct WhatsAppChannel {
    pub(super) config: WhatsAppConfig,
    pub(super) auth: KvAuthState,
    /// Client handle for sending messages, set after `start()`.
    pub(super) client: Arc<Mutex<Option<Arc<Client>>>>,
    pub(super) state: Arc<Mutex<ConnectionState>>,
    /// Last QR code data, buffered so the HTTP page can render it
    /// until the scan completes.
    pub(super) last_qr: Arc<Mutex<Option<String>>>,
    /// Message sender, stored so a reconnect can reuse it.
    pub(super) msg_tx: Arc<Mutex<Option<mpsc::Sender<GroupMessage>>>>,
    /// The current bot instance, if one was built.
    pub(super) running: Mutex<Option<RunningBot>>,
    /// Signals the reconnect supervisor that the connection dropped.
    pub(super) reconnect_tx: mpsc::Sender<()>,
    pub(super) reconnect_rx: Mutex<Option<mpsc::Receiver<()>>>,
    pub(super) supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl WhatsAppChannel {
    /// Create a new WhatsApp channel from config.
    pub fn new(config: WhatsAppConfig, auth: KvAuthState) -> Self {
        let (reconnect_tx, reconnect_rx) = mpsc::channel(1);
        Self {
            config,
            auth,
            client: Arc::new(Mutex::new(None)),
            state: Arc::new(Mutex::new(ConnectionState::Starting)),
            last_qr: Arc::new(Mutex::new(None)),
            msg_tx: Arc::new(Mutex::new(None)),
            running: Mutex::new(None),
            reconnect_tx,
            reconnect_rx: Mutex::new(Some(reconnect_rx)),
            supervisor: Mutex::new(None),
        }
    }

    /// Check if the WhatsApp client is currently connected.
    pub async fn is_connected(&self) -> bool {
        *self.state.lock().await == ConnectionState::Connected
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    /// The pending pairing QR payload, if a scan is awaited.
    pub async fn last_qr(&self) -> Option<String> {
        self.last_qr.lock().await.clone()
    }
}
