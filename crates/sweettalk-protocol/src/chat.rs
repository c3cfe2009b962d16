//! Chat endpoint types.
//!
//! `POST /api/chat` takes a JSON [`ChatRequest`] and answers with an
//! SSE-style body: one `data: <payload>` line per event, terminated by the
//! literal `[DONE]` sentinel. Payloads are either `{"content": "..."}` JSON
//! or raw text.

use base64::Engine;
use serde::{Deserialize, Serialize};

/// Line prefix carrying an event payload on the chat stream.
pub const DATA_PREFIX: &str = "data: ";

/// Sentinel payload signalling stream completion out-of-band from data.
pub const DONE_SENTINEL: &str = "[DONE]";

/// Maximum number of images accepted per chat turn.
pub const MAX_IMAGES: usize = 3;

/// Reply style requested from the assistant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyStyle {
    #[default]
    Humorous,
    Gentle,
    Direct,
    Literary,
}

/// An inline image attached to a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Base64-encoded bytes, without a `data:` URI prefix.
    pub data: String,
    /// MIME type, e.g. "image/jpeg" or "image/png".
    pub media_type: String,
}

impl ImageContent {
    /// Encode raw image bytes for the wire.
    pub fn from_bytes(bytes: &[u8], media_type: impl Into<String>) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.into(),
        }
    }

    /// Data URI usable as an inline preview of this attachment.
    pub fn preview_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// One chat turn sent to `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The message the other person sent. May be empty only when images
    /// are present.
    pub their_message: String,

    /// Requested reply style.
    #[serde(default)]
    pub style: ReplyStyle,

    /// Free-text background for the conversation ("we're coworkers", ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Chat screenshots to read the other side's message from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageContent>>,
}

impl ChatRequest {
    /// Whether this request carries anything for the assistant to work with:
    /// non-whitespace text or at least one image. Requests violating this
    /// must not be issued.
    pub fn has_payload(&self) -> bool {
        !self.their_message.trim().is_empty()
            || self.images.as_ref().is_some_and(|imgs| !imgs.is_empty())
    }
}

/// One decoded event from the chat stream.
///
/// Exactly one terminal event (`Done` or `Failed`) is produced per request;
/// any number of `Fragment`s strictly precede it, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// An incremental piece of assistant reply text.
    Fragment(String),
    /// The reply is complete.
    Done,
    /// The request failed; no further events follow.
    Failed(String),
}

impl ChatEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Done | ChatEvent::Failed(_))
    }
}
