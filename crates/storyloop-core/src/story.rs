//! Story session types as reported by the story service.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

/// Opaque story session identifier assigned by the story service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(String);

impl StoryId {
    /// Wraps a service-issued identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StoryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Payload of a completed scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneResult {
    /// Video reference (URL).
    pub video: String,
    /// Narration audio, base64 encoded.
    pub narration_audio: String,
    /// Narration text for captions.
    pub narration_text: String,
    /// Available next actions, in display order.
    pub actions: Vec<String>,
}

impl SceneResult {
    /// Decodes the narration audio payload into raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `base64::DecodeError` if the payload is not valid standard
    /// base64.
    pub fn decode_narration_audio(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.narration_audio.as_bytes())
    }
}

/// Server-reported progress of a story session.
///
/// Serialized with the `status` field as the tag, matching the wire format
/// `{"status": "completed", "result": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StoryStatus {
    /// The service is still generating the scene.
    Processing,
    /// The scene is ready.
    Completed {
        /// The generated scene.
        result: SceneResult,
    },
    /// Generation failed on the service side.
    Error,
}

impl StoryStatus {
    /// Returns the payload-free tag for this status.
    #[must_use]
    pub fn tag(&self) -> StatusTag {
        match self {
            Self::Processing => StatusTag::Processing,
            Self::Completed { .. } => StatusTag::Completed,
            Self::Error => StatusTag::Error,
        }
    }

    /// Returns the scene result if the status is `Completed`.
    #[must_use]
    pub fn result(&self) -> Option<&SceneResult> {
        match self {
            Self::Completed { result } => Some(result),
            Self::Processing | Self::Error => None,
        }
    }
}

/// Payload-free status discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTag {
    /// See [`StoryStatus::Processing`].
    Processing,
    /// See [`StoryStatus::Completed`].
    Completed,
    /// See [`StoryStatus::Error`].
    Error,
}

impl StatusTag {
    /// Whether polling should stop once this status is observed.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
