//! Filler messages so the account reads as a regular member.

use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use warden_core::{config::PresenceConfig, traits::GroupClient};

/// Background task: sleep a random interval, then post one filler message.
pub async fn presence_loop(config: PresenceConfig, group: String, client: Arc<dyn GroupClient>) {
    info!(
        "presence loop started (every {}-{} min)",
        config.min_interval_minutes, config.max_interval_minutes
    );
    loop {
        tokio::time::sleep(next_interval(&config)).await;

        if !is_within_active_hours(&config.active_start, &config.active_end) {
            debug!("presence: outside active hours, skipping");
            continue;
        }
        if !client.is_connected().await {
            debug!("presence: not connected, skipping");
            continue;
        }

        let Some(text) = pick_message(&config.messages) else {
            continue;
        };
        match client.send_text(&group, text).await {
            Ok(_) => info!("presence message posted to {group}"),
            Err(e) => warn!("presence message failed: {e}"),
        }
    }
}

fn next_interval(config: &PresenceConfig) -> Duration {
    let min = config.min_interval_minutes.max(1);
    let max = config.max_interval_minutes.max(min);
    Duration::from_secs(rand::thread_rng().gen_range(min..=max) * 60)
}

fn pick_message(messages: &[String]) -> Option<&str> {
    messages
        .choose(&mut rand::thread_rng())
        .map(String::as_str)
        .filter(|m| !m.trim().is_empty())
}

/// Check local time against an `HH:MM` window. Empty bounds mean always active.
fn is_within_active_hours(start: &str, end: &str) -> bool {
    let now = chrono::Local::now().format("%H:%M").to_string();
    in_window(&now, start, end)
}

fn in_window(now: &str, start: &str, end: &str) -> bool {
    if start.is_empty() || end.is_empty() {
        return true;
    }
    if start <= end {
        now >= start && now < end
    } else {
        // Midnight wrap: e.g. 22:00 to 06:00
        now >= start || now < end
    }
}
