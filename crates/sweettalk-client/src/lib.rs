//! SweetTalk client library.
//!
//! Provides the two collaborating pieces of the chat assistant's client side:
//!
//! - [`api::ApiClient`]: typed HTTP client for the phrase library endpoints
//!   plus the incremental streaming-chat decoder. Stream outcomes are
//!   delivered as [`sweettalk_protocol::ChatEvent`]s on a channel; exactly one
//!   terminal event fires per request.
//! - [`chat::Conversation`] / [`chat::ChatSession`]: the ordered message list
//!   and the state machine that applies stream events to the assistant
//!   placeholder created at submit time.

pub mod api;
pub mod chat;
pub mod config;
pub mod error;

pub use api::ApiClient;
pub use chat::{ChatSession, Conversation};
pub use config::ClientConfig;
pub use error::ClientError;
