//! Conversation message types.

use serde::{Deserialize, Serialize};

/// Message identifier, unique and monotonically increasing within one
/// conversation.
pub type MessageId = u64;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// Lifecycle of an assistant reply.
///
/// `Pending → Streaming → Settled | Failed`; terminal states never
/// transition again. User messages are created `Settled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delivery {
    /// Placeholder created at submit time, no content yet.
    Pending,
    /// Fragments are being appended.
    Streaming,
    /// Reply complete.
    Settled,
    /// The request failed; content holds the apology text.
    Failed,
}

impl Delivery {
    pub fn is_terminal(self) -> bool {
        matches!(self, Delivery::Settled | Delivery::Failed)
    }
}

/// Inline preview of an image attached to a user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentPreview {
    /// Data URI suitable for an `<img src>`.
    pub preview_uri: String,
}

/// One entry in the conversation's message list. Never deleted; the list
/// only grows for the life of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub author: Author,
    pub content: String,
    pub delivery: Delivery,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentPreview>,
}

impl Message {
    /// Whether the assistant placeholder is still waiting for its first
    /// fragment.
    pub fn is_pending(&self) -> bool {
        self.delivery == Delivery::Pending
    }
}
