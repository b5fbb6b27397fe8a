//! Storyloop Core — shared domain types.
//!
//! This crate defines the story session vocabulary (ids, statuses, scene
//! results), the error types, and the `StoryBackend` port that every other
//! crate depends on. It contains no infrastructure code.

pub mod backend;
pub mod error;
pub mod story;
