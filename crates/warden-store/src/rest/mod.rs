//! Hosted store reached over a PostgREST API (Supabase-compatible).
//!
//! Expects two tables exposed under `/rest/v1/`:
//! - `auth_sessions (key text primary key, value jsonb)`
//! - `warnings (user_id text primary key, warn_count int, created_at timestamptz, updated_at timestamptz)`

mod kv;
mod warnings;

use reqwest::{Method, RequestBuilder, Response};
use tracing::debug;
use warden_core::error::WardenError;

pub(crate) const SESSIONS_TABLE: &str = "auth_sessions";
pub(crate) const WARNINGS_TABLE: &str = "warnings";

/// PostgREST-backed store.
#[derive(Clone)]
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    /// Create a client for `base_url` (project root, e.g. `https://xyz.supabase.co`).
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, WardenError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(WardenError::Config(format!(
                "store url '{base_url}' must start with http:// or https://"
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .map_err(|e| WardenError::Store(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `{base}/rest/v1/{table}?{query}`.
    pub(crate) fn table_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/rest/v1/{table}", self.base_url)
        } else {
            format!("{}/rest/v1/{table}?{query}", self.base_url)
        }
    }

    /// Request with the auth headers PostgREST/Supabase expect.
    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!("rest store: {method} {url}");
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    /// Send and map transport errors and non-2xx statuses to `WardenError::Store`.
    pub(crate) async fn send(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<Response, WardenError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| WardenError::Store(format!("{what}: request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(WardenError::Store(format!("{what}: returned {status}: {text}")));
        }
        Ok(resp)
    }
}

/// `column=eq.value` filter with the value URL-encoded.
pub(crate) fn eq_filter(column: &str, value: &str) -> String {
    format!("{column}=eq.{}", urlencoding::encode(value))
}

/// `column=in.("a","b")` filter. Values are double-quoted so commas and
/// parentheses inside keys survive.
pub(crate) fn in_filter(column: &str, values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!(
        "{column}=in.({})",
        urlencoding::encode(&quoted.join(","))
    )
}

/// `column=like.prefix*` filter. `*` is PostgREST's wildcard; literal `%`,
/// `_` and `*` in the prefix are escaped.
pub(crate) fn prefix_filter(column: &str, prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '*' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('*');
    format!("{column}=like.{}", urlencoding::encode(&escaped))
}

#[cfg(test)]
mod tests;
