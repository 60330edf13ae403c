//! Core types for Mood

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::path::Path;

use crate::error::{MoodError, Result};

/// User identifier as sent by the backend (any JSON number, or a string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(Number),
    Text(String),
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId::Number(Number::from(id))
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Text(id.to_string())
    }
}

/// Profile payload returned by the backend
///
/// The client trusts the server's shape: only `id` is required, and any
/// fields it does not know about (`avatarUrl` included) are kept in `extra`
/// so that a persisted profile round-trips unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UserProfile {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            name: None,
            nick: None,
            avatar_url: None,
            extra: Map::new(),
        }
    }

    /// Best human-readable label: nick, then name, then id
    pub fn display_name(&self) -> String {
        self.nick
            .clone()
            .or_else(|| self.name.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// Body of a successful `POST /user/signin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: UserProfile,
}

// ============================================================================
// Attachment Types
// ============================================================================

/// Image MIME types the client can recognise
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Parse MIME type from a MIME string (e.g., "image/jpeg")
    pub fn from_mime_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/gif" => Some(Self::Gif),
            "image/webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect MIME type from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An image picked for a new post
///
/// The backend accepts JPEG only, so anything else is rejected when the
/// attachment is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub bytes: Vec<u8>,
    pub mime_type: ImageMimeType,
}

impl ImageAttachment {
    /// Wrap already-encoded JPEG bytes
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime_type: ImageMimeType::Jpeg,
        }
    }

    /// Read an image from disk
    ///
    /// # Errors
    ///
    /// Returns `MoodError::InvalidInput` if the file cannot be read, is empty,
    /// or is not a JPEG image.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let mime_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageMimeType::from_extension)
            .ok_or_else(|| {
                MoodError::InvalidInput(format!(
                    "'{}' is not a recognised image file",
                    path.display()
                ))
            })?;

        if mime_type != ImageMimeType::Jpeg {
            return Err(MoodError::InvalidInput(format!(
                "Only JPEG images can be posted ({} given)",
                mime_type
            )));
        }

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            MoodError::InvalidInput(format!("Failed to read '{}': {}", path.display(), e))
        })?;

        if bytes.is_empty() {
            return Err(MoodError::InvalidInput(format!(
                "'{}' is empty",
                path.display()
            )));
        }

        tracing::debug!("Loaded image attachment {:?} ({} bytes)", path, bytes.len());
        Ok(Self { bytes, mime_type })
    }
}
