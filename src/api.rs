//! HTTP status server for pairing and uptime checks.
//!
//! Spawned as a background task in the gateway, same pattern as the presence loop.

use async_trait::async_trait;
use axum::{
    extract::State,
    response::{Html, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use warden_channels::whatsapp::{self, WhatsAppChannel};
use warden_core::{config::ApiConfig, message::ConnectionState};

/// What the HTTP handlers need to know about the connection.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    async fn connection_state(&self) -> ConnectionState;
    /// Pending pairing QR payload.
    async fn pairing_qr(&self) -> Option<String>;
}

#[async_trait]
impl ConnectionProbe for WhatsAppChannel {
    async fn connection_state(&self) -> ConnectionState {
        WhatsAppChannel::connection_state(self).await
    }

    async fn pairing_qr(&self) -> Option<String> {
        self.last_qr().await
    }
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    probe: Arc<dyn ConnectionProbe>,
    group: String,
    name: String,
    uptime: Instant,
}

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html>\n<html><head><meta charset=\"utf-8\">\
         <meta http-equiv=\"refresh\" content=\"10\">\
         <title>{title}</title></head>\
         <body style=\"font-family:sans-serif;text-align:center;margin-top:3em\">\
         <h1>{title}</h1>{body}</body></html>"
    ))
}

fn status_body(state: ConnectionState, group: &str) -> String {
    let mut body = format!("<p>{}</p>", state.describe());
    if state == ConnectionState::AwaitingScan {
        body.push_str("<p><a href=\"/qr\">Open the pairing QR code</a></p>");
    }
    if !group.is_empty() {
        body.push_str(&format!("<p>Group: <code>{group}</code></p>"));
    }
    body
}

/// `GET /`: Human-readable status page.
async fn index(State(state): State<ApiState>) -> Html<String> {
    let conn = state.probe.connection_state().await;
    page(&state.name, &status_body(conn, &state.group))
}

/// `GET /qr`: Pairing QR as an inline PNG while a scan is pending.
async fn qr(State(state): State<ApiState>) -> Html<String> {
    let conn = state.probe.connection_state().await;
    let Some(code) = state.probe.pairing_qr().await else {
        return page(&state.name, &status_body(conn, &state.group));
    };

    match whatsapp::generate_qr_data_uri(&code) {
        Ok(uri) => page(
            "Scan to pair",
            &format!(
                "<p>WhatsApp &rarr; Linked devices &rarr; Link a device</p>\
                 <img src=\"{uri}\" alt=\"pairing QR code\" width=\"320\" height=\"320\">"
            ),
        ),
        Err(e) => {
            warn!("QR image generation failed: {e}");
            page(&state.name, "<p>QR code unavailable, check the logs.</p>")
        }
    }
}

/// `GET /status`: JSON probe for uptime monitors.
async fn status(State(state): State<ApiState>) -> Json<Value> {
    let conn = state.probe.connection_state().await;
    Json(json!({
        "status": conn.as_str(),
        "connected": conn == ConnectionState::Connected,
        "group": state.group,
        "uptime_secs": state.uptime.elapsed().as_secs(),
    }))
}

/// Build the axum router with shared state.
fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/qr", get(qr))
        .route("/status", get(status))
        .with_state(state)
}

/// Start the API server. Called from `Gateway::run()`.
pub async fn serve(
    config: ApiConfig,
    probe: Arc<dyn ConnectionProbe>,
    name: String,
    group: String,
    uptime: Instant,
) {
    let state = ApiState {
        probe,
        group,
        name,
        uptime,
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("API server failed to bind to {addr}: {e}");
            return;
        }
    };

    info!("API server listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        error!("API server error: {e}");
    }
}
