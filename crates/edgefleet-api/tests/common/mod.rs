//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use edgefleet_core::clock::Clock;
use edgefleet_test_support::{FixedClock, RecordingContainerManager};
use edgefleet_worker::config::WorkerConfig;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use edgefleet_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over the in-memory store with a deterministic
/// clock. Uses the same route structure as `main.rs`.
pub fn build_test_app() -> (Router, Arc<RecordingContainerManager>) {
    let containers = Arc::new(RecordingContainerManager::new());
    let state = AppState::in_memory(fixed_clock(), containers.clone(), WorkerConfig::default());
    (edgefleet_api::app(state), containers)
}

/// Build the full app router over PostgreSQL.
pub fn build_pg_test_app(pool: PgPool) -> Router {
    let state = AppState::postgres(
        pool,
        fixed_clock(),
        Arc::new(RecordingContainerManager::new()),
        WorkerConfig::default(),
    );
    edgefleet_api::app(state)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    // Extractor rejections answer with plain text.
    let json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body_bytes).into_owned())
        })
    };

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a POST request without a body and return the response.
pub async fn post_empty(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Send a DELETE request with an optional JSON body and return the response.
pub async fn delete(
    app: &Router,
    uri: &str,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method("DELETE").uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// Post a device message to the ingress endpoint.
pub async fn ingest(app: &Router, message: serde_json::Value) -> (StatusCode, serde_json::Value) {
    post_json(app, "/api/v1/events", &message).await
}
