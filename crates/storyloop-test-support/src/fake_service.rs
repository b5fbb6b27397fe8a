//! In-process fake of the upstream story service.
//!
//! Serves the upstream contract (`/initialize`, `/story_status/{id}`,
//! `/next_scene`) from memory. Every story replays the same status script:
//! each poll advances one step and the last step repeats. `next_scene`
//! rewinds the script for that story.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use storyloop_core::story::StoryStatus;
use uuid::Uuid;

/// A request observed by the fake service.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// Request path, e.g. `/initialize`.
    pub path: String,
    /// JSON body, or `Value::Null` for GET requests.
    pub body: Value,
}

#[derive(Debug)]
struct FakeState {
    script: Vec<StoryStatus>,
    forced_failure: Option<StatusCode>,
    /// Poll cursor per story id.
    stories: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Handle to a fake story service. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct FakeStoryService {
    state: Arc<FakeState>,
}

impl FakeStoryService {
    /// Create a service whose stories replay `script` on successive polls.
    ///
    /// An empty script behaves like `[processing]`.
    #[must_use]
    pub fn new(script: Vec<StoryStatus>) -> Self {
        Self::build(script, None)
    }

    /// Create a service that answers every request with `status` and an
    /// error body.
    #[must_use]
    pub fn failing(status: StatusCode) -> Self {
        Self::build(Vec::new(), Some(status))
    }

    fn build(script: Vec<StoryStatus>, forced_failure: Option<StatusCode>) -> Self {
        Self {
            state: Arc::new(FakeState {
                script,
                forced_failure,
                stories: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Router serving the upstream contract at the root.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/initialize", post(initialize))
            .route("/story_status/{story_id}", get(story_status))
            .route("/next_scene", post(next_scene))
            .with_state(Arc::clone(&self.state))
    }

    /// Returns a snapshot of every request received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Number of requests received whose path starts with `prefix`.
    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .count()
    }
}

impl FakeState {
    fn record(&self, path: String, body: Value) {
        self.requests
            .lock()
            .unwrap()
            .push(RecordedRequest { path, body });
    }

    fn failure(&self) -> Option<Response> {
        self.forced_failure
            .map(|status| (status, Json(json!({ "error": "forced failure" }))).into_response())
    }

    fn status_at(&self, cursor: usize) -> StoryStatus {
        match self.script.len() {
            0 => StoryStatus::Processing,
            len => self.script[cursor.min(len - 1)].clone(),
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn initialize(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.record("/initialize".to_owned(), body.clone());
    if let Some(failure) = state.failure() {
        return failure;
    }
    if body.get("user_theme").and_then(Value::as_str).is_none() {
        return bad_request("Missing user_theme in request body");
    }

    let story_id = Uuid::new_v4().to_string();
    state.stories.lock().unwrap().insert(story_id.clone(), 0);

    Json(json!({ "story_id": story_id, "status": "processing" })).into_response()
}

async fn story_status(
    State(state): State<Arc<FakeState>>,
    Path(story_id): Path<String>,
) -> Response {
    state.record(format!("/story_status/{story_id}"), Value::Null);
    if let Some(failure) = state.failure() {
        return failure;
    }

    let cursor = {
        let mut stories = state.stories.lock().unwrap();
        let Some(cursor) = stories.get_mut(&story_id) else {
            return bad_request("Invalid story_id");
        };
        let current = *cursor;
        *cursor += 1;
        current
    };

    let mut body = serde_json::to_value(state.status_at(cursor)).unwrap();
    if body.get("result").is_none() {
        body["result"] = json!({});
    }
    Json(body).into_response()
}

async fn next_scene(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.record("/next_scene".to_owned(), body.clone());
    if let Some(failure) = state.failure() {
        return failure;
    }

    let (Some(story_id), Some(_)) = (
        body.get("story_id").and_then(Value::as_str),
        body.get("user_action").and_then(Value::as_str),
    ) else {
        return bad_request("Missing story_id or user_action in request body");
    };

    let mut stories = state.stories.lock().unwrap();
    let Some(cursor) = stories.get_mut(story_id) else {
        return bad_request("Invalid story_id");
    };
    *cursor = 0;

    Json(json!({ "story_id": story_id, "status": "processing" })).into_response()
}

/// Serve `router` on an ephemeral localhost port and return its address.
///
/// The server runs until the test's runtime shuts down.
///
/// # Panics
///
/// Panics if the listener cannot be bound.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}
