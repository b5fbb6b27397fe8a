//! Storyloop — story progress coordination.
//!
//! Drives one story session through initialize → poll → act → poll against a
//! [`StoryBackend`](storyloop_core::backend::StoryBackend), publishing every
//! state change as a [`StorySnapshot`].

pub mod coordinator;
pub mod snapshot;

pub use coordinator::{CoordinatorConfig, StoryProgressCoordinator};
pub use snapshot::StorySnapshot;
