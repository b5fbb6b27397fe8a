//! Storyloop — HTTP story backend.
//!
//! Implements [`StoryBackend`](storyloop_core::backend::StoryBackend) with
//! `reqwest` against the same-origin `/api/*` endpoints.

pub mod http_story_backend;

pub use http_story_backend::{HttpBackendConfig, HttpStoryBackend};
