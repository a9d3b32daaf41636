//! End-to-end tests for the HTTP surface: the app is served on an
//! ephemeral port and driven over real sockets.
//!
//! Run with: cargo test --test receive_link

use std::net::SocketAddr;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tempfile::TempDir;
use teloxide::Bot;
use teloxide::types::Update;

use qrelay::audit::AuditLog;
use qrelay::bot::{BotDelivery, WorkerPool};
use qrelay::config::Config;
use qrelay::qr::QrConfig;
use qrelay::server::{self, AppState, WEBHOOK_SECRET_HEADER};

const TOKEN: &str = "123456789:TESTTOKENTESTTOKEN";
const SECRET: &str = "abc123";

/// Serve the real router on an ephemeral port. No delivery target is
/// configured, so accepted payloads stop at generation + audit.
async fn start_server(dir: &TempDir, use_hmac: bool) -> SocketAddr {
    let config = Config {
        api_key: TOKEN.to_string(),
        target_chat_id: None,
        webhook_secret: SECRET.to_string(),
        use_hmac,
        port: 0,
        data_dir: dir.path().to_path_buf(),
        use_polling: false,
    };
    let audit = AuditLog::open(dir.path().join("received_links.ndjson"))
        .await
        .unwrap();
    let state = AppState {
        config: Arc::new(config),
        delivery: Arc::new(BotDelivery::new(Bot::new(TOKEN))),
        audit: Arc::new(audit),
        qr: QrConfig::default(),
        updates: WorkerPool::spawn(1, 4, |_: Update| async {}),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::app(state)).await.unwrap();
    });
    addr
}

fn hmac_header(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

fn audit_line_count(dir: &TempDir) -> usize {
    std::fs::read_to_string(dir.path().join("received_links.ndjson"))
        .map(|content| content.lines().count())
        .unwrap_or(0)
}

#[tokio::test]
async fn health_check_responds() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir, false).await;

    let response = reqwest::get(format!("http://{addr}/")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "qrelay is running");
}

#[tokio::test]
async fn valid_plain_secret_roundtrip() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir, false).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/receive_link"))
        .header(WEBHOOK_SECRET_HEADER, SECRET)
        .body(r#"{"url":"https://example.com"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["received_url"], "https://example.com");
    assert_eq!(audit_line_count(&dir), 1);
}

#[tokio::test]
async fn wrong_plain_secret_is_forbidden() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir, false).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/receive_link"))
        .header(WEBHOOK_SECRET_HEADER, "wrong")
        .body(r#"{"url":"https://example.com"}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid secret");
    assert_eq!(audit_line_count(&dir), 0);
}

#[tokio::test]
async fn missing_url_is_bad_request() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir, false).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/receive_link"))
        .header(WEBHOOK_SECRET_HEADER, SECRET)
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "missing url");
}

#[tokio::test]
async fn hmac_mode_accepts_signed_and_rejects_mutated() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir, true).await;
    let client = reqwest::Client::new();

    let body = br#"{"url":"x"}"#;
    let header = hmac_header(SECRET, body);

    let response = client
        .post(format!("http://{addr}/receive_link"))
        .header(WEBHOOK_SECRET_HEADER, &header)
        .body(body.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    // Same signature over a mutated body must be rejected.
    let response = client
        .post(format!("http://{addr}/receive_link"))
        .header(WEBHOOK_SECRET_HEADER, &header)
        .body(r#"{"url":"y"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Flipping the final digest character must be rejected.
    let mut mutated = header.clone();
    let last = mutated.pop().unwrap();
    mutated.push(if last == '0' { '1' } else { '0' });
    let response = client
        .post(format!("http://{addr}/receive_link"))
        .header(WEBHOOK_SECRET_HEADER, &mutated)
        .body(body.to_vec())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid signature");
}

#[tokio::test]
async fn telegram_webhook_always_answers_ok() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir, false).await;
    let client = reqwest::Client::new();

    let update = r#"{
        "update_id": 1,
        "message": {
            "message_id": 10,
            "date": 1700000000,
            "chat": {"id": 42, "type": "private", "first_name": "Alice"},
            "from": {"id": 7, "is_bot": false, "first_name": "Alice"},
            "text": "hello"
        }
    }"#;

    let response = client
        .post(format!("http://{addr}/webhook/{TOKEN}"))
        .body(update)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = client
        .post(format!("http://{addr}/webhook/123456789:NOTOURTOKEN"))
        .body(update)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let dir = TempDir::new().unwrap();
    let addr = start_server(&dir, false).await;

    let huge = format!(r#"{{"url":"{}"}}"#, "a".repeat(server::MAX_BODY_SIZE));
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/receive_link"))
        .header(WEBHOOK_SECRET_HEADER, SECRET)
        .body(huge)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 413);
}
