//! HTTP surface: health check, link receiver, and Telegram webhook ingress.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use teloxide::types::Update;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::bot::{BotDelivery, WorkerPool};
use crate::config::Config;
use crate::qr::{self, QrConfig};
use crate::signature::{self, SecretMode};

/// Header carrying the shared secret or HMAC signature.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";
/// Maximum request body size (64KB) -- prevents memory exhaustion
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) -- prevents slow-loris attacks
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Link payload pushed by the partner service. Parsed leniently: a body
/// that is not valid JSON degrades to the default (empty) payload, which
/// then fails the `url` validation rather than the parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingLinkPayload {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<String>,
}

/// Shared state for all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub delivery: Arc<BotDelivery>,
    pub audit: Arc<AuditLog>,
    pub qr: QrConfig,
    pub updates: WorkerPool<Update>,
}

/// Assemble the router with body-limit and timeout layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_health))
        .route("/receive_link", post(handle_receive_link))
        .route("/webhook/{token}", post(handle_telegram_update))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .with_state(state)
}

pub async fn handle_health() -> &'static str {
    "qrelay is running"
}

/// Receive an authenticated link payload, encode it as a QR image, and
/// forward it to the configured chat.
pub async fn handle_receive_link(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<serde_json::Value>) {
    let header_value = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let mode = state.config.secret_mode();
    if !signature::verify(&body, header_value, mode, &state.config.webhook_secret) {
        let error = match mode {
            SecretMode::Hmac => "invalid signature",
            SecretMode::Plain => "invalid secret",
        };
        return (StatusCode::FORBIDDEN, Json(json!({"error": error})));
    }

    let payload: IncomingLinkPayload = serde_json::from_slice(&body).unwrap_or_default();
    if payload.url.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "missing url"})));
    }

    // The payload is authenticated and carries a url: record it.
    if let Err(e) = state.audit.append(&payload).await {
        warn!("Failed to append audit record: {e}");
    }

    let png = match qr::generate(&payload.url, &state.qr) {
        Ok(png) => png,
        Err(e) => {
            warn!("QR generation failed for received link: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "qr_generation_failed", "detail": e.to_string()})),
            );
        }
    };

    match state.config.target_chat_id {
        Some(chat_id) => {
            let caption = (!payload.caption.is_empty()).then_some(payload.caption.as_str());
            if let Err(detail) = state.delivery.send_qr_image(chat_id, png, caption, None).await {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "telegram send failed", "detail": detail})),
                );
            }
        }
        None => {
            info!(
                "No delivery target configured; QR for {} generated ({} bytes) and discarded",
                payload.url,
                png.len()
            );
        }
    }

    (
        StatusCode::OK,
        Json(json!({"ok": true, "received_url": payload.url})),
    )
}

/// Telegram update ingress. Always answers 200: Telegram retries on
/// anything else, and there is nothing useful to tell it about a bad
/// update. Updates are queued for the worker pool; the response never
/// waits on chat delivery.
pub async fn handle_telegram_update(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    if !signature::constant_time_eq(&token, &state.config.api_key) {
        warn!("Webhook called with a token that is not ours; dropping update");
        return StatusCode::OK;
    }

    match serde_json::from_slice::<Update>(&body) {
        Ok(update) => {
            if state.updates.try_submit(update).is_err() {
                warn!("Update queue full, dropping update");
            }
        }
        Err(e) => warn!("Discarding malformed update: {e}"),
    }

    StatusCode::OK
}
