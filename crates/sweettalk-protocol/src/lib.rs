//! Wire types for the SweetTalk chat-assistant API.
//!
//! This crate defines the request/response shapes spoken between clients and
//! the SweetTalk backend: the streaming chat endpoint and the phrase library
//! endpoints. It carries no transport logic; the client crate owns that.

pub mod chat;
pub mod phrases;

pub use chat::{
    ChatEvent, ChatRequest, ImageContent, ReplyStyle, DATA_PREFIX, DONE_SENTINEL, MAX_IMAGES,
};
pub use phrases::{Category, Phrase, PhraseQuery};
