//! Story routes, proxied to the upstream story service.

use axum::extract::{Path, State};
use axum::http::header::CACHE_CONTROL;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, ProxyOperation};
use crate::state::AppState;

/// Sent on every status response so repeated polls are never served from a
/// cache.
const NO_STORE: &str = "no-store, max-age=0";

/// POST /initialize
#[instrument(skip(state, body))]
async fn initialize(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, "forwarding initialize");

    let upstream = state
        .upstream
        .post_json(&["initialize"], &body)
        .await
        .map_err(|e| ApiError::new(ProxyOperation::Initialize, e))?;

    info!(%correlation_id, "initialize forwarded");
    Ok(Json(upstream))
}

/// GET /story_status/{story_id}
#[instrument(skip(state))]
async fn story_status(
    State(state): State<AppState>,
    Path(story_id): Path<String>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, "forwarding story_status");

    let result = state
        .upstream
        .get_json(&["story_status", &story_id])
        .await
        .map(Json)
        .map_err(|e| ApiError::new(ProxyOperation::StoryStatus, e));

    ([(CACHE_CONTROL, NO_STORE)], result)
}

/// POST /next_scene
#[instrument(skip(state, body))]
async fn next_scene(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let correlation_id = Uuid::new_v4();
    info!(%correlation_id, "forwarding next_scene");

    let upstream = state
        .upstream
        .post_json(&["next_scene"], &body)
        .await
        .map_err(|e| ApiError::new(ProxyOperation::NextScene, e))?;

    info!(%correlation_id, "next_scene forwarded");
    Ok(Json(upstream))
}

/// Returns the router for the proxied story endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/initialize", post(initialize))
        .route("/story_status/{story_id}", get(story_status))
        .route("/next_scene", post(next_scene))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use storyloop_test_support::{FakeStoryService, spawn_server};
    use tower::ServiceExt;

    use crate::upstream::UpstreamClient;

    async fn app_for(fake: &FakeStoryService) -> Router {
        let addr = spawn_server(fake.router()).await;
        let upstream =
            UpstreamClient::new(&format!("http://{addr}"), Duration::from_secs(5)).unwrap();
        router().with_state(AppState::new(upstream))
    }

    #[tokio::test]
    async fn test_initialize_rejects_malformed_json_without_calling_upstream() {
        // Arrange
        let fake = FakeStoryService::new(vec![]);
        let app = app_for(&fake).await;

        let request = Request::builder()
            .method("POST")
            .uri("/initialize")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert — Axum rejects malformed JSON before the handler runs.
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(fake.requests().is_empty());
    }

    #[tokio::test]
    async fn test_story_status_failure_still_disables_caching() {
        // Arrange
        let fake = FakeStoryService::new(vec![]);
        let app = app_for(&fake).await;

        let request = Request::builder()
            .method("GET")
            .uri("/story_status/unknown")
            .body(Body::empty())
            .unwrap();

        // Act
        let response = app.oneshot(request).await.unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[CACHE_CONTROL], NO_STORE);
    }
}
