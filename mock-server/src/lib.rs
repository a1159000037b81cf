//! Mock of the SOAR platform's internal REST API.
//!
//! Emulates the endpoints the client core talks to — identity probe,
//! incident batch delete, attachment/entry upload, indicator delete, entry
//! context clear, content-pack upload — plus a tiny marketplace serving pack
//! archives. Requests must authenticate with either the static API key or a
//! nonce/timestamp SHA-256 signature over it; the marketplace is public.
//!
//! Every API route is also mounted under `/xsoar`, mirroring the real
//! platform's API prefix for key-id-based installs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio::sync::RwLock;

/// Shared server state.
pub struct MockState {
    api_key: String,
    /// entry id -> file name for uploaded attachments.
    pub entries: RwLock<HashMap<String, String>>,
    /// Incident ids deleted through batchDelete.
    pub deleted_incidents: RwLock<Vec<String>>,
    /// Query strings seen by the pack upload endpoint.
    pub pack_uploads: RwLock<Vec<String>>,
    entry_counter: AtomicU64,
}

impl MockState {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            entries: RwLock::new(HashMap::new()),
            deleted_incidents: RwLock::new(Vec::new()),
            pack_uploads: RwLock::new(Vec::new()),
            entry_counter: AtomicU64::new(1),
        }
    }
}

pub type SharedState = Arc<MockState>;

pub fn app(api_key: &str) -> Router {
    let state: SharedState = Arc::new(MockState::new(api_key));
    app_with_state(state)
}

pub fn app_with_state(state: SharedState) -> Router {
    Router::new()
        .nest("/xsoar", routes())
        .merge(routes())
        .with_state(state)
}

pub async fn run(listener: TcpListener, api_key: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(api_key)).await
}

fn routes() -> Router<SharedState> {
    Router::new()
        .route("/user", get(user))
        .route("/health", get(health))
        .route("/unstable", get(unstable))
        .route("/incident/batchDelete", post(batch_delete))
        .route("/incident/upload/{incident_id}/attachment", post(upload_attachment))
        .route("/entry/upload/{incident_id}/attachment", post(upload_attachment))
        .route("/Indicators/delete/v2/{entry_id}", post(delete_indicator))
        .route("/entry", delete(clear_entry_context))
        .route("/contentpacks/installed/upload", post(pack_upload))
        .route("/marketplace/{pack}/{version}/{file}", get(marketplace_archive))
}

/// Accepts either the static key in `Authorization` or, when nonce and
/// timestamp headers are present, the SHA-256 hex digest of
/// `key + nonce + timestamp`.
fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    };
    let auth = header("authorization");
    let nonce = header("x-xdr-nonce");
    let timestamp = header("x-xdr-timestamp");
    if nonce.is_empty() || timestamp.is_empty() {
        return auth == state.api_key;
    }
    let mut hasher = Sha256::new();
    hasher.update(state.api_key.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.update(timestamp.as_bytes());
    auth == hex::encode(hasher.finalize())
}

fn guard(state: &MockState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    if authorized(state, headers) {
        Ok(())
    } else {
        Err((StatusCode::UNAUTHORIZED, "invalid credentials".to_string()))
    }
}

async fn user(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, String)> {
    guard(&state, &headers)?;
    Ok(Json(json!({ "username": "admin", "roles": ["Administrator"] })))
}

/// Plain-text endpoint: the client must pass this through untouched.
async fn health(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<String, (StatusCode, String)> {
    guard(&state, &headers)?;
    Ok("ok".to_string())
}

async fn unstable() -> (StatusCode, String) {
    (StatusCode::SERVICE_UNAVAILABLE, "unavailable".to_string())
}

#[derive(Deserialize)]
pub struct BatchDelete {
    pub ids: Vec<String>,
    #[serde(default)]
    pub all: bool,
    #[serde(default)]
    pub filter: Value,
}

async fn batch_delete(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(input): Json<BatchDelete>,
) -> Result<Json<Value>, (StatusCode, String)> {
    guard(&state, &headers)?;
    let data: Vec<Value> = input
        .ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "name": format!("incident-{id}"),
                "status": 0,
                "closeReason": "Deleted",
            })
        })
        .collect();
    state.deleted_incidents.write().await.extend(input.ids.iter().cloned());
    Ok(Json(json!({
        "data": data,
        "total": input.ids.len(),
        "notUpdated": 0,
    })))
}

async fn upload_attachment(
    State(state): State<SharedState>,
    Path(incident_id): Path<String>,
    headers: HeaderMap,
    _body: Bytes,
) -> Result<Json<Value>, (StatusCode, String)> {
    guard(&state, &headers)?;
    let n = state.entry_counter.fetch_add(1, Ordering::SeqCst);
    let entry_id = format!("{n}@{incident_id}");
    state
        .entries
        .write()
        .await
        .insert(entry_id.clone(), "uploaded-file".to_string());
    Ok(Json(json!({ "entries": [{ "id": entry_id }] })))
}

async fn delete_indicator(
    State(state): State<SharedState>,
    Path(entry_id): Path<String>,
    headers: HeaderMap,
    _body: Bytes,
) -> Result<Json<Value>, (StatusCode, String)> {
    guard(&state, &headers)?;
    match state.entries.write().await.remove(&entry_id) {
        Some(_) => Ok(Json(json!({ "deleted": entry_id }))),
        None => Err((StatusCode::NOT_FOUND, format!("no entry {entry_id}"))),
    }
}

async fn clear_entry_context(
    State(state): State<SharedState>,
    headers: HeaderMap,
    _body: Bytes,
) -> Result<Json<Value>, (StatusCode, String)> {
    guard(&state, &headers)?;
    Ok(Json(json!({})))
}

async fn pack_upload(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    _body: Bytes,
) -> Result<Json<Value>, (StatusCode, String)> {
    guard(&state, &headers)?;
    state
        .pack_uploads
        .write()
        .await
        .push(query.unwrap_or_default());
    Ok(Json(json!({})))
}

/// Public pack archive download; no auth, fixed placeholder bytes.
async fn marketplace_archive(
    Path((_pack, _version, _file)): Path<(String, String, String)>,
) -> Bytes {
    Bytes::from_static(b"PK\x03\x04mock-pack-archive")
}
