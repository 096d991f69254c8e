//! HTTP contract of the share API, driven through the router in-process.

#![cfg(feature = "server")]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use once_share::handlers::AppState;
use once_share::server::{ServerConfig, build_router};
use once_share::{ExchangeError, ExchangeStore, ManualClock};
use serde_json::{Value, json};
use tower::ServiceExt;

fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        base_url: "https://share.example/".to_string(),
        ..ServerConfig::default()
    }
}

fn app_with_config(cfg: &ServerConfig) -> Router {
    let store = Arc::new(ExchangeStore::builder().build());
    build_router(AppState::new(store, cfg.base_url.clone()), cfg)
}

fn app_with_clock(clock: &ManualClock) -> Router {
    let store = Arc::new(
        ExchangeStore::builder()
            .with_time_provider(clock.provider())
            .build(),
    );
    build_router(AppState::new(store, "https://share.example/"), &test_config())
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/api/share")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post_share(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/share")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_share(token: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/api/share/{token}"))
        .body(Body::empty())
        .unwrap()
}

fn delete_share(token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/api/share/{token}"))
        .body(Body::empty())
        .unwrap()
}

async fn create(app: &Router, body: Value) -> String {
    let (status, body) = send(app, post_share(body)).await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = app_with_clock(&ManualClock::new());
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["time"].as_str().is_some());
}

#[tokio::test]
async fn test_create_defaults_to_24_hours() {
    let clock = ManualClock::new();
    let app = app_with_clock(&clock);

    let (status, body) = send(
        &app,
        post_share(json!({
            "secret": "hunter2",
            "service_name": "Gmail",
            "username": "a@b.com",
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 43);
    assert_eq!(
        body["share_url"],
        format!("https://share.example/share/{token}")
    );

    let expires_at: chrono::DateTime<chrono::Utc> =
        body["expires_at"].as_str().unwrap().parse().unwrap();
    assert_eq!((expires_at - clock.now()).num_hours(), 24);
}

#[tokio::test]
async fn test_create_with_non_positive_hours_uses_default() {
    let clock = ManualClock::new();
    let app = app_with_clock(&clock);

    let (_, body) = send(
        &app,
        post_share(json!({
            "encrypted_password": "opaque-ciphertext",
            "service_name": "Gmail",
            "username": "a@b.com",
            "expiration_hours": -5,
        })),
    )
    .await;

    let expires_at: chrono::DateTime<chrono::Utc> =
        body["expires_at"].as_str().unwrap().parse().unwrap();
    assert_eq!((expires_at - clock.now()).num_hours(), 24);
}

#[tokio::test]
async fn test_create_rejects_missing_fields() {
    let app = app_with_clock(&ManualClock::new());

    let (status, body) = send(
        &app,
        post_share(json!({ "secret": "hunter2", "service_name": "Gmail" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");

    let (status, _) = send(
        &app,
        post_share(json!({ "secret": "", "service_name": "Gmail", "username": "u" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_rejects_malformed_body() {
    let app = app_with_clock(&ManualClock::new());
    let request = Request::builder()
        .method("POST")
        .uri("/api/share")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid request body");
}

#[tokio::test]
async fn test_redeem_once_then_already_viewed() {
    let app = app_with_clock(&ManualClock::new());
    let token = create(
        &app,
        json!({ "secret": "hunter2", "service_name": "Gmail", "username": "a@b.com" }),
    )
    .await;

    let (status, body) = send(&app, get_share(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["secret"], "hunter2");
    assert_eq!(body["service_name"], "Gmail");
    assert_eq!(body["username"], "a@b.com");
    assert!(body["created_at"].is_string());

    let (status, body) = send(&app, get_share(&token)).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "This share has already been viewed");
    assert_eq!(body["details"]["service_name"], "Gmail");
    assert_eq!(body["details"]["username"], "a@b.com");
    assert!(body["details"]["viewed_at"].is_string());
    assert!(body["details"].get("secret").is_none());

    let (status, _) = send(&app, get_share(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_redeem_after_expiry() {
    let clock = ManualClock::new();
    let app = app_with_clock(&clock);
    let token = create(
        &app,
        json!({
            "secret": "hunter2",
            "service_name": "Gmail",
            "username": "a@b.com",
            "expiration_hours": 1,
        }),
    )
    .await;

    clock.advance(Duration::from_secs(61 * 60));

    let (status, body) = send(&app, get_share(&token)).await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["error"], "This share has expired");

    let (status, _) = send(&app, get_share(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_token() {
    let app = app_with_clock(&ManualClock::new());

    let (status, body) = send(&app, get_share("does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Share not found or expired");

    let (status, body) = send(&app, delete_share("does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Share not found");
}

#[tokio::test]
async fn test_delete_then_redeem() {
    let app = app_with_clock(&ManualClock::new());
    let token = create(
        &app,
        json!({ "secret": "hunter2", "service_name": "Gmail", "username": "a@b.com" }),
    )
    .await;

    let (status, body) = send(&app, delete_share(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Share deleted successfully");

    let (status, _) = send(&app, get_share(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_reports_generation_failure_as_internal_error() {
    let store = Arc::new(
        ExchangeStore::builder()
            .with_handle_generator(|| {
                Err(ExchangeError::GenerationFailed(
                    "entropy source unavailable".to_string(),
                ))
            })
            .build(),
    );
    let app = build_router(AppState::new(store, "https://share.example/"), &test_config());

    let (status, body) = send(
        &app,
        post_share(json!({ "secret": "hunter2", "service_name": "Gmail", "username": "a@b.com" })),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn test_cors_preflight() {
    let app = app_with_clock(&ManualClock::new());

    let response = app
        .oneshot(preflight("https://elsewhere.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_cors_with_allowed_origins() {
    let app = app_with_config(&ServerConfig {
        allowed_origin: Some("https://a.example, https://b.example".to_string()),
        ..test_config()
    });

    let response = app
        .clone()
        .oneshot(preflight("https://b.example"))
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://b.example"
    );
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let response = app
        .oneshot(preflight("https://elsewhere.example"))
        .await
        .unwrap();
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_static_frontend_fallback() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();

    let app = app_with_config(&ServerConfig {
        frontend_dir: Some(dir.path().to_path_buf()),
        ..test_config()
    });

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<h1>hi</h1>");

    // API routes still take precedence over the fallback
    let request = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
