// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HTTP transport for a CBOR conformance bridge.
//!
//! | Route | Body | Response |
//! |---|---|---|
//! | `GET /health` | none | `{"status":"ok","library":..,"version":..,"language":..}` |
//! | `POST /decode` | `{"hex": "<hex>"}` | decode envelope |
//! | `POST /encode` | `{"value": <json-safe>}` | encode envelope |
//!
//! Codec failures are still `200`; only an unreadable request is a `400`.
//! Anything else is `404 {"error":"Not found"}`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cbor_bridge_config::prefs::HTTP_BRIDGE_KEY;
use cbor_bridge_config::{ConfigService, ConfigStore, HttpBridgePrefs};
use cbor_bridge_core::{CborBackend, CodecService, Envelope};
use serde_json::{json, Value as JsonValue};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Request bodies above this size are refused with `413`.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Build the bridge router around a shared codec.
pub fn app<B>(codec: CodecService<B>, max_body_bytes: usize) -> Router
where
    B: CborBackend + 'static,
{
    Router::new()
        .route("/health", get(health::<B>).fallback(not_found))
        .route("/decode", post(decode::<B>).fallback(not_found))
        .route("/encode", post(encode::<B>).fallback(not_found))
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(Arc::new(codec))
}

/// Serve `app` on `listener` until `shutdown` resolves, then drain in-flight requests.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().context("listener address")?;
    info!("cbor bridge listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("http server failed")
}

/// Resolves once Ctrl+C is received (or immediately if the handler cannot be installed).
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to install ctrl-c handler; shutting down");
        return;
    }
    info!("ctrl-c received; shutting down");
}

/// Log filter from `RUST_LOG`-style directives; unset, blank or invalid falls back to `info`.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Pick the listen address: explicit flag first, then saved prefs.
pub fn listen_addr(flag: Option<SocketAddr>, prefs: &HttpBridgePrefs) -> Result<SocketAddr> {
    match flag {
        Some(addr) => Ok(addr),
        None => prefs
            .listen
            .parse()
            .with_context(|| format!("invalid listen address {:?} in saved prefs", prefs.listen)),
    }
}

/// Load the HTTP bridge prefs, persisting defaults when absent.
///
/// Best effort: a missing or broken store yields the defaults.
pub fn load_prefs<S: ConfigStore>(config: Option<&ConfigService<S>>) -> HttpBridgePrefs {
    let Some(config) = config else {
        return HttpBridgePrefs::default();
    };
    config
        .load_or_init(HTTP_BRIDGE_KEY)
        .unwrap_or_else(|err| {
            warn!(%err, "http bridge prefs unavailable; using defaults");
            HttpBridgePrefs::default()
        })
}

async fn health<B: CborBackend>(State(codec): State<Arc<CodecService<B>>>) -> Json<JsonValue> {
    let info = codec.info();
    Json(json!({
        "status": "ok",
        "library": info.library,
        "version": info.version,
        "language": info.language,
    }))
}

async fn decode<B: CborBackend>(
    State(codec): State<Arc<CodecService<B>>>,
    body: Bytes,
) -> Response {
    let request = match parse_body(&body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    let Some(hex) = request.get("hex").and_then(JsonValue::as_str) else {
        return bad_request("Missing \"hex\" field".to_owned());
    };
    Json(codec.decode(hex)).into_response()
}

async fn encode<B: CborBackend>(
    State(codec): State<Arc<CodecService<B>>>,
    body: Bytes,
) -> Response {
    let request = match parse_body(&body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };
    let JsonValue::Object(mut fields) = request else {
        return bad_request("Missing \"value\" field".to_owned());
    };
    let Some(value) = fields.remove("value") else {
        return bad_request("Missing \"value\" field".to_owned());
    };
    Json(codec.encode(value)).into_response()
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"error": "Not found"}))).into_response()
}

fn parse_body(body: &[u8]) -> std::result::Result<JsonValue, Response> {
    serde_json::from_slice(body).map_err(|err| bad_request(format!("Invalid JSON: {err}")))
}

fn bad_request(error: String) -> Response {
    warn!(%error, "rejected request");
    (StatusCode::BAD_REQUEST, Json(Envelope::Failed { error })).into_response()
}
