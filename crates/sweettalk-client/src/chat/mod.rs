//! Conversation state machine.
//!
//! A [`Conversation`] owns the ordered message list and the draft buffers
//! for the next turn. `submit` appends the user message and a pending
//! assistant placeholder atomically and hands back the outbound request
//! bound to the placeholder's id; stream events are applied back through
//! `apply`, which targets only that id (never "the last message"), so a
//! slow event cannot touch messages appended after its turn.
//!
//! One turn is in flight per conversation (single-flight). Separate
//! conversations are fully independent; there is no process-wide state.

mod message;

pub use message::{AttachmentPreview, Author, Delivery, Message, MessageId};

use tracing::{debug, warn};

use sweettalk_protocol::{ChatEvent, ChatRequest, ImageContent, ReplyStyle, MAX_IMAGES};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};

/// Greeting seeded as the first assistant message of every conversation.
pub const GREETING: &str = "你好呀~ 我是你的撩妹AI助手! 💕\n\n告诉我她说了什么，我来帮你想高情商回复~\n\n你可以选择不同的回复风格，还可以添加背景信息让回复更精准哦!";

/// Shown in place of the reply when a turn fails, whatever the cause.
pub const APOLOGY: &str = "抱歉，出了点问题~ 请稍后再试 😅";

/// Pending input buffers for the next turn.
#[derive(Debug, Default, Clone)]
struct Draft {
    text: String,
    context: String,
    style: ReplyStyle,
    images: Vec<ImageContent>,
}

impl Draft {
    fn to_request(&self) -> ChatRequest {
        ChatRequest {
            their_message: self.text.trim().to_string(),
            style: self.style,
            context: if self.context.is_empty() {
                None
            } else {
                Some(self.context.clone())
            },
            images: if self.images.is_empty() {
                None
            } else {
                Some(self.images.clone())
            },
        }
    }
}

/// A submitted turn: the request to send and the placeholder it settles into.
#[derive(Debug, Clone)]
pub struct Outbound {
    pub assistant_id: MessageId,
    pub request: ChatRequest,
}

/// One chat conversation: message list, draft, and single-flight gate.
#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    draft: Draft,
    next_id: MessageId,
    streaming: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    /// Create a conversation seeded with the assistant greeting.
    pub fn new() -> Self {
        Self {
            messages: vec![Message {
                id: 0,
                author: Author::Assistant,
                content: GREETING.to_string(),
                delivery: Delivery::Settled,
                attachments: Vec::new(),
            }],
            draft: Draft::default(),
            next_id: 1,
            streaming: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Whether a turn is currently in flight.
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    // -- Draft buffers --------------------------------------------------

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    pub fn input(&self) -> &str {
        &self.draft.text
    }

    pub fn set_context(&mut self, context: impl Into<String>) {
        self.draft.context = context.into();
    }

    pub fn set_style(&mut self, style: ReplyStyle) {
        self.draft.style = style;
    }

    pub fn style(&self) -> ReplyStyle {
        self.draft.style
    }

    /// Attach a chat screenshot to the next turn. At most
    /// [`MAX_IMAGES`] per turn.
    pub fn attach_image(&mut self, image: ImageContent) -> ClientResult<()> {
        if self.draft.images.len() >= MAX_IMAGES {
            return Err(ClientError::TooManyImages { max: MAX_IMAGES });
        }
        self.draft.images.push(image);
        Ok(())
    }

    pub fn clear_images(&mut self) {
        self.draft.images.clear();
    }

    pub fn attached_images(&self) -> usize {
        self.draft.images.len()
    }

    // -- Turn lifecycle -------------------------------------------------

    fn allocate_id(&mut self) -> MessageId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Submit the draft as a new turn.
    ///
    /// Returns `None` without any effect when a turn is already in flight,
    /// or when the draft carries neither text nor images. Otherwise the user
    /// message and a pending assistant placeholder are appended atomically,
    /// the text and image buffers are cleared (context and style persist
    /// across turns), and the outbound request is returned for the transport.
    pub fn submit(&mut self) -> Option<Outbound> {
        if self.streaming {
            debug!("submit ignored: turn already in flight");
            return None;
        }

        let request = self.draft.to_request();
        if !request.has_payload() {
            debug!("submit ignored: empty draft");
            return None;
        }

        let attachments = self
            .draft
            .images
            .iter()
            .map(|image| AttachmentPreview {
                preview_uri: image.preview_uri(),
            })
            .collect();

        let user_id = self.allocate_id();
        let assistant_id = self.allocate_id();

        self.messages.push(Message {
            id: user_id,
            author: Author::User,
            content: request.their_message.clone(),
            delivery: Delivery::Settled,
            attachments,
        });
        self.messages.push(Message {
            id: assistant_id,
            author: Author::Assistant,
            content: String::new(),
            delivery: Delivery::Pending,
            attachments: Vec::new(),
        });

        self.draft.text.clear();
        self.draft.images.clear();
        self.streaming = true;

        Some(Outbound {
            assistant_id,
            request,
        })
    }

    /// Apply one stream event to the placeholder it was bound to.
    ///
    /// Mutates only the message with `assistant_id`; the list may have grown
    /// since the event was emitted. Terminal deliveries are never reopened.
    pub fn apply(&mut self, assistant_id: MessageId, event: ChatEvent) {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == assistant_id) else {
            warn!(assistant_id, "stream event for unknown message dropped");
            return;
        };

        match event {
            ChatEvent::Fragment(text) => {
                if message.delivery.is_terminal() {
                    return;
                }
                message.content.push_str(&text);
                message.delivery = Delivery::Streaming;
            }
            ChatEvent::Done => {
                if message.delivery.is_terminal() {
                    return;
                }
                self.streaming = false;
                message.delivery = Delivery::Settled;
            }
            ChatEvent::Failed(reason) => {
                if message.delivery.is_terminal() {
                    return;
                }
                self.streaming = false;
                warn!(assistant_id, %reason, "chat turn failed");
                message.content = APOLOGY.to_string();
                message.delivery = Delivery::Failed;
            }
        }
    }
}

/// One conversation bound to a backend client.
///
/// Each session owns its own in-flight state, so concurrent sessions need no
/// global coordination.
pub struct ChatSession {
    client: ApiClient,
    conversation: Conversation,
}

impl ChatSession {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            conversation: Conversation::new(),
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Mutable access for draft edits between turns.
    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Submit the draft and drive the reply stream to completion, applying
    /// every event to the conversation. Returns `false` when the submit was
    /// a no-op (empty draft or turn already in flight).
    pub async fn send(&mut self) -> bool {
        let Some(Outbound {
            assistant_id,
            request,
        }) = self.conversation.submit()
        else {
            return false;
        };

        let mut events = self.client.stream_chat(request);
        while let Some(event) = events.recv().await {
            let terminal = event.is_terminal();
            self.conversation.apply(assistant_id, event);
            if terminal {
                break;
            }
        }

        // The pump task guarantees a terminal event; a closed channel without
        // one means the task died. Settle the placeholder rather than wedge
        // the single-flight gate.
        if self.conversation.is_streaming() {
            self.conversation.apply(
                assistant_id,
                ChatEvent::Failed("chat stream closed unexpectedly".to_string()),
            );
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(conversation: &mut Conversation, text: &str) {
        conversation.set_input(text);
    }

    #[test]
    fn test_new_conversation_has_greeting() {
        let conversation = Conversation::new();
        assert_eq!(conversation.messages().len(), 1);
        let greeting = &conversation.messages()[0];
        assert_eq!(greeting.author, Author::Assistant);
        assert_eq!(greeting.content, GREETING);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_submit_empty_draft_is_noop() {
        let mut conversation = Conversation::new();
        let before = conversation.messages().len();

        assert!(conversation.submit().is_none());

        draft(&mut conversation, "   \n ");
        assert!(conversation.submit().is_none());

        assert_eq!(conversation.messages().len(), before);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_submit_appends_user_and_placeholder() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "  test message  ");
        let before = conversation.messages().len();

        let outbound = conversation.submit().expect("draft should submit");

        assert_eq!(conversation.messages().len(), before + 2);
        assert_eq!(outbound.request.their_message, "test message");
        assert_eq!(outbound.request.style, ReplyStyle::Humorous);

        let user = &conversation.messages()[before];
        assert_eq!(user.author, Author::User);
        assert_eq!(user.content, "test message");
        assert_eq!(user.delivery, Delivery::Settled);

        let placeholder = &conversation.messages()[before + 1];
        assert_eq!(placeholder.id, outbound.assistant_id);
        assert_eq!(placeholder.author, Author::Assistant);
        assert!(placeholder.content.is_empty());
        assert!(placeholder.is_pending());

        assert!(conversation.is_streaming());
        assert!(conversation.input().is_empty());
    }

    #[test]
    fn test_submit_while_streaming_is_noop() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "first");
        conversation.submit().unwrap();
        let before = conversation.messages().len();

        draft(&mut conversation, "second");
        assert!(conversation.submit().is_none());
        assert_eq!(conversation.messages().len(), before);
    }

    #[test]
    fn test_fragments_accumulate_in_order() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "hi");
        let outbound = conversation.submit().unwrap();

        conversation.apply(outbound.assistant_id, ChatEvent::Fragment("这是".into()));
        conversation.apply(outbound.assistant_id, ChatEvent::Fragment("AI回复".into()));

        let reply = conversation.messages().last().unwrap();
        assert_eq!(reply.content, "这是AI回复");
        assert_eq!(reply.delivery, Delivery::Streaming);
        assert!(conversation.is_streaming());

        conversation.apply(outbound.assistant_id, ChatEvent::Done);
        let reply = conversation.messages().last().unwrap();
        assert_eq!(reply.content, "这是AI回复");
        assert_eq!(reply.delivery, Delivery::Settled);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_done_without_fragments_settles_empty_reply() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "hi");
        let outbound = conversation.submit().unwrap();

        conversation.apply(outbound.assistant_id, ChatEvent::Done);

        let reply = conversation.messages().last().unwrap();
        assert_eq!(reply.delivery, Delivery::Settled);
        assert!(reply.content.is_empty());
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_failure_replaces_partial_content_with_apology() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "hi");
        let outbound = conversation.submit().unwrap();

        conversation.apply(outbound.assistant_id, ChatEvent::Fragment("partial".into()));
        conversation.apply(
            outbound.assistant_id,
            ChatEvent::Failed("500 Internal Server Error".into()),
        );

        let reply = conversation.messages().last().unwrap();
        assert_eq!(reply.content, APOLOGY);
        assert_eq!(reply.delivery, Delivery::Failed);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_apply_targets_captured_id_not_last_message() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "first");
        let first = conversation.submit().unwrap();
        conversation.apply(first.assistant_id, ChatEvent::Done);

        draft(&mut conversation, "second");
        let second = conversation.submit().unwrap();

        // A late event for the first turn must not touch the second turn's
        // placeholder, even though the list has grown.
        conversation.apply(first.assistant_id, ChatEvent::Fragment("stale".into()));

        let first_reply = conversation
            .messages()
            .iter()
            .find(|m| m.id == first.assistant_id)
            .unwrap();
        assert_eq!(first_reply.delivery, Delivery::Settled);
        assert!(!first_reply.content.contains("stale"));

        let second_reply = conversation
            .messages()
            .iter()
            .find(|m| m.id == second.assistant_id)
            .unwrap();
        assert!(second_reply.content.is_empty());
        assert!(second_reply.is_pending());
    }

    #[test]
    fn test_terminal_state_never_reopened() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "hi");
        let outbound = conversation.submit().unwrap();

        conversation.apply(outbound.assistant_id, ChatEvent::Failed("boom".into()));
        conversation.apply(outbound.assistant_id, ChatEvent::Done);
        conversation.apply(outbound.assistant_id, ChatEvent::Fragment("late".into()));

        let reply = conversation.messages().last().unwrap();
        assert_eq!(reply.content, APOLOGY);
        assert_eq!(reply.delivery, Delivery::Failed);
    }

    #[test]
    fn test_event_for_unknown_id_is_dropped() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "hi");
        let outbound = conversation.submit().unwrap();

        conversation.apply(9999, ChatEvent::Fragment("lost".into()));

        let reply = conversation.messages().last().unwrap();
        assert!(reply.content.is_empty());
        assert_eq!(outbound.request.their_message, "hi");
    }

    #[test]
    fn test_images_only_submit_allowed() {
        let mut conversation = Conversation::new();
        conversation
            .attach_image(ImageContent::from_bytes(b"\xff\xd8", "image/jpeg"))
            .unwrap();

        let outbound = conversation.submit().expect("image-only draft submits");
        assert!(outbound.request.their_message.is_empty());
        assert_eq!(outbound.request.images.as_ref().unwrap().len(), 1);

        let user = &conversation.messages()[conversation.messages().len() - 2];
        assert_eq!(user.attachments.len(), 1);
        assert!(user.attachments[0].preview_uri.starts_with("data:image/jpeg;base64,"));

        // Image buffer cleared with the rest of the draft.
        assert_eq!(conversation.attached_images(), 0);
    }

    #[test]
    fn test_attach_image_limit() {
        let mut conversation = Conversation::new();
        for _ in 0..3 {
            conversation
                .attach_image(ImageContent::from_bytes(b"x", "image/png"))
                .unwrap();
        }
        let err = conversation
            .attach_image(ImageContent::from_bytes(b"x", "image/png"))
            .unwrap_err();
        assert!(matches!(err, ClientError::TooManyImages { max: 3 }));

        conversation.clear_images();
        assert_eq!(conversation.attached_images(), 0);
    }

    #[test]
    fn test_context_and_style_carried_on_request() {
        let mut conversation = Conversation::new();
        conversation.set_style(ReplyStyle::Literary);
        conversation.set_context("我们是同事");
        draft(&mut conversation, "在吗");

        let outbound = conversation.submit().unwrap();
        assert_eq!(outbound.request.style, ReplyStyle::Literary);
        assert_eq!(outbound.request.context.as_deref(), Some("我们是同事"));

        // Both style and context are sticky across turns; only the text and
        // image buffers are cleared by submit.
        assert_eq!(conversation.style(), ReplyStyle::Literary);
        conversation.apply(outbound.assistant_id, ChatEvent::Done);
        draft(&mut conversation, "又来了");
        let next = conversation.submit().unwrap();
        assert_eq!(next.request.style, ReplyStyle::Literary);
        assert_eq!(next.request.context.as_deref(), Some("我们是同事"));

        // Until replaced explicitly.
        conversation.apply(next.assistant_id, ChatEvent::Done);
        conversation.set_context("");
        draft(&mut conversation, "再来");
        let third = conversation.submit().unwrap();
        assert!(third.request.context.is_none());
    }

    #[test]
    fn test_stale_terminal_event_keeps_gate_closed() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "first");
        let first = conversation.submit().unwrap();
        conversation.apply(first.assistant_id, ChatEvent::Done);

        draft(&mut conversation, "second");
        let second = conversation.submit().unwrap();
        assert!(conversation.is_streaming());

        // Duplicate terminal events for the settled first turn must not open
        // the gate of the turn in flight.
        conversation.apply(first.assistant_id, ChatEvent::Done);
        assert!(conversation.is_streaming());
        conversation.apply(first.assistant_id, ChatEvent::Failed("stale".into()));
        assert!(conversation.is_streaming());

        conversation.apply(second.assistant_id, ChatEvent::Done);
        assert!(!conversation.is_streaming());
    }

    #[test]
    fn test_ids_monotonic_across_turns() {
        let mut conversation = Conversation::new();
        draft(&mut conversation, "one");
        let first = conversation.submit().unwrap();
        conversation.apply(first.assistant_id, ChatEvent::Done);

        draft(&mut conversation, "two");
        let second = conversation.submit().unwrap();

        assert!(second.assistant_id > first.assistant_id);
        let ids: Vec<_> = conversation.messages().iter().map(|m| m.id).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }
}
