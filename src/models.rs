//! Core data types for the chat session engine.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed id for the synthetic welcome message seeded into a fresh log.
pub const WELCOME_MESSAGE_ID: &str = "welcome";

// === Messages ===

/// Who authored a message.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire-protocol role string for the remote chat API.
    #[must_use]
    pub fn as_api_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in the conversation log.
///
/// `text` is append-only while the message is in flight (streaming) and
/// frozen once the exchange terminates.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A user message with its text fixed at creation.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// An assistant message seeded with the first received chunk.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    /// The synthetic greeting seeded into a fresh conversation log.
    #[must_use]
    pub fn welcome(display_name: Option<&str>) -> Self {
        let name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("there");
        Self {
            id: WELCOME_MESSAGE_ID.to_string(),
            role: Role::Assistant,
            text: format!(
                "Hi {name}! I'm the StudyWithMe study assistant. \
                 How can I help with your studies today?"
            ),
            created_at: Utc::now(),
        }
    }
}

// === Identity ===

/// The user identity gating chat participation.
///
/// Immutable once produced; editing the profile replaces the whole value.
/// Absence of a profile is a valid state (anonymous visitor).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserProfile {
    pub display_name: String,
    /// Base64-encoded avatar image, if the user uploaded one.
    pub avatar: Option<String>,
}

impl UserProfile {
    #[must_use]
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            avatar: None,
        }
    }

    /// Attach an avatar from raw image bytes, base64-encoded for storage.
    #[must_use]
    pub fn with_avatar_bytes(mut self, bytes: &[u8]) -> Self {
        self.avatar = Some(BASE64.encode(bytes));
        self
    }
}

// === Streaming Events ===

/// One event from a streaming exchange with the remote model.
///
/// A stream is a finite ordered sequence of `Chunk`s followed by exactly one
/// terminal event. Transport errors are converted into content by the client
/// (an apology chunk precedes the `Failed` terminal), so consumers never need
/// a separate error branch.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyEvent {
    /// A partial-text fragment of the reply, exact bytes preserved.
    Chunk(String),
    /// The exchange completed normally.
    Done,
    /// The exchange ended early; the reason is for logs only.
    Failed(String),
}
