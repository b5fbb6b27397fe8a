//! Route modules.

pub mod health;
pub mod story;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router. Shared by `main.rs` and the
/// integration tests.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api", story::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
