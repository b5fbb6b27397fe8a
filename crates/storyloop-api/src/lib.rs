//! Storyloop API — same-origin proxy for the upstream story service.
//!
//! Exposes `/api/initialize`, `/api/story_status/{story_id}` and
//! `/api/next_scene`, forwarding JSON bodies unmodified to the upstream
//! service and collapsing every upstream failure into a generic HTTP 500.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upstream;
