use super::*;
use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, Method as AxumMethod, StatusCode},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use warden_core::traits::{KeyValueStore, WarningStore};
use warden_core::warning::WarningRecord;

#[test]
fn test_new_trims_trailing_slash() {
    let store = RestStore::new("https://xyz.supabase.co/", "k").unwrap();
    assert_eq!(store.base_url(), "https://xyz.supabase.co");
    assert_eq!(
        store.table_url("warnings", ""),
        "https://xyz.supabase.co/rest/v1/warnings"
    );
    assert_eq!(
        store.table_url("warnings", "user_id=eq.1"),
        "https://xyz.supabase.co/rest/v1/warnings?user_id=eq.1"
    );
}

#[test]
fn test_new_rejects_non_http_url() {
    assert!(RestStore::new("xyz.supabase.co", "k").is_err());
}

#[test]
fn test_eq_filter_encodes_value() {
    assert_eq!(
        eq_filter("key", "session-5511@s.whatsapp.net.0"),
        "key=eq.session-5511%40s.whatsapp.net.0"
    );
}

#[test]
fn test_in_filter_quotes_values() {
    let f = in_filter("key", &["a".to_string(), "b,c".to_string()]);
    let decoded = urlencoding::decode(f.strip_prefix("key=in.").unwrap()).unwrap();
    assert_eq!(decoded, "(\"a\",\"b,c\")");
}

#[test]
fn test_prefix_filter_escapes_wildcards() {
    let f = prefix_filter("key", "lid_mapping-");
    let decoded = urlencoding::decode(f.strip_prefix("key=like.").unwrap()).unwrap();
    assert_eq!(decoded, "lid\\_mapping-*");
}

// ---------------------------------------------------------------------------
// Mock PostgREST server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    query: String,
    apikey: Option<String>,
    prefer: Option<String>,
    body: Option<Value>,
}

#[derive(Clone)]
struct Mock {
    requests: Arc<Mutex<Vec<Recorded>>>,
    reply: Arc<Mutex<(StatusCode, Value)>>,
}

async fn record(
    State(mock): State<Mock>,
    method: AxumMethod,
    uri: axum::http::Uri,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    mock.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: query.unwrap_or_default(),
        apikey: headers
            .get("apikey")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        prefer: headers
            .get("prefer")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_str(&body).ok(),
    });
    let (status, reply) = mock.reply.lock().unwrap().clone();
    (status, Json(reply))
}

async fn spawn_mock(status: StatusCode, reply: Value) -> (RestStore, Mock) {
    let mock = Mock {
        requests: Arc::new(Mutex::new(Vec::new())),
        reply: Arc::new(Mutex::new((status, reply))),
    };
    let app = Router::new()
        .route("/rest/v1/{table}", any(record))
        .with_state(mock.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let store = RestStore::new(&format!("http://{addr}"), "service-key").unwrap();
    (store, mock)
}

#[tokio::test]
async fn test_get_warning_parses_row_and_sends_auth() {
    let (store, mock) = spawn_mock(
        StatusCode::OK,
        json!([{
            "user_id": "5511",
            "warn_count": 2,
            "created_at": "2026-10-01T10:00:00+00:00",
            "updated_at": "2026-10-02T10:00:00.5+00:00"
        }]),
    )
    .await;

    let rec = store.get_warning("5511").await.unwrap().unwrap();
    assert_eq!(rec.warn_count, 2);
    assert_eq!(rec.user_id, "5511");

    let reqs = mock.requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].method, "GET");
    assert_eq!(reqs[0].path, "/rest/v1/warnings");
    assert!(reqs[0].query.contains("user_id=eq.5511"));
    assert_eq!(reqs[0].apikey.as_deref(), Some("service-key"));
}

#[tokio::test]
async fn test_get_warning_empty_is_none() {
    let (store, _mock) = spawn_mock(StatusCode::OK, json!([])).await;
    assert!(store.get_warning("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_warning_upserts() {
    let (store, mock) = spawn_mock(StatusCode::CREATED, json!(null)).await;
    let mut rec = WarningRecord::new("5511");
    rec.increment();
    store.save_warning(&rec).await.unwrap();

    let reqs = mock.requests.lock().unwrap();
    assert_eq!(reqs[0].method, "POST");
    assert!(reqs[0]
        .prefer
        .as_deref()
        .unwrap()
        .contains("resolution=merge-duplicates"));
    let body = reqs[0].body.as_ref().unwrap();
    assert_eq!(body[0]["user_id"], "5511");
    assert_eq!(body[0]["warn_count"], 1);
}

#[tokio::test]
async fn test_error_status_becomes_store_error() {
    let (store, _mock) =
        spawn_mock(StatusCode::UNAUTHORIZED, json!({"message": "bad key"})).await;
    let err = store.get_warning("5511").await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("401"), "unexpected error: {msg}");
    assert!(msg.contains("bad key"));
}

#[tokio::test]
async fn test_kv_get_and_prefix_scan() {
    let (store, mock) = spawn_mock(
        StatusCode::OK,
        json!([{"key": "creds", "value": {"registration_id": 42}}]),
    )
    .await;

    let value = store.get("creds").await.unwrap().unwrap();
    assert_eq!(value["registration_id"], 42);

    let entries = store.entries_with_prefix("cr").await.unwrap();
    assert_eq!(entries.len(), 1);

    let reqs = mock.requests.lock().unwrap();
    assert_eq!(reqs[0].path, "/rest/v1/auth_sessions");
    assert!(reqs[1].query.contains("order=key.asc"));
}

#[tokio::test]
async fn test_kv_set_many_sends_one_batch() {
    let (store, mock) = spawn_mock(StatusCode::CREATED, json!(null)).await;
    store
        .set_many(&[
            ("pre-key-1".to_string(), json!("a")),
            ("pre-key-2".to_string(), json!("b")),
        ])
        .await
        .unwrap();
    store.set_many(&[]).await.unwrap();

    let reqs = mock.requests.lock().unwrap();
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].body.as_ref().unwrap().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_kv_clear_uses_filter() {
    let (store, mock) = spawn_mock(StatusCode::NO_CONTENT, json!(null)).await;
    store.clear().await.unwrap();
    let reqs = mock.requests.lock().unwrap();
    assert_eq!(reqs[0].method, "DELETE");
    assert_eq!(reqs[0].query, "key=not.is.null");
}
