//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use storyloop_test_support::{FakeStoryService, spawn_server};
use tower::ServiceExt;

use storyloop_api::routes;
use storyloop_api::state::AppState;
use storyloop_api::upstream::UpstreamClient;

/// Build the full proxy router pointed at an upstream listening on `addr`.
/// Uses the same route structure as `main.rs`.
pub fn build_test_app(upstream_addr: SocketAddr) -> Router {
    let upstream =
        UpstreamClient::new(&format!("http://{upstream_addr}"), Duration::from_secs(5)).unwrap();
    routes::app(AppState::new(upstream))
}

/// Start `fake` on an ephemeral port and build a proxy in front of it.
pub async fn build_app_for(fake: &FakeStoryService) -> Router {
    let addr = spawn_server(fake.router()).await;
    build_test_app(addr)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response, headers included.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, HeaderMap, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, headers, json)
}
