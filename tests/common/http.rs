//! Helpers for driving the router without a socket

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use linetrace_telemetry::{AppState, ServerConfig};
use serde_json::Value;
use tower::ServiceExt;

/// App state with a small store and otherwise default config
pub fn test_state(capacity: usize) -> AppState {
    let mut config = ServerConfig::default();
    config.store.capacity = capacity;
    AppState::from_config(config)
}

/// Send one request and return the status and JSON body
///
/// A body that is not JSON is returned as a string value.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body collects");
    let body = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request");
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .expect("valid request");
    send(app, request).await
}
