//! Incremental decoder for the chat endpoint's SSE-style framing.
//!
//! The body is a byte stream of `data: <payload>` lines. Chunks can split
//! lines, and multi-byte UTF-8 sequences, at arbitrary points, so the decoder
//! keeps a byte buffer across reads: everything up to the last `\n` is
//! consumed, the remainder is retained for the next chunk. Complete lines are
//! always whole UTF-8 sequences because a partial character can never contain
//! the `\n` delimiter byte.

use sweettalk_protocol::{ChatEvent, DATA_PREFIX, DONE_SENTINEL};
use tracing::warn;

/// Stateful line framer for the chat stream.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the payloads of all `data:` lines completed
    /// by it, in order. Lines without the prefix are ignored.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let Some(last_newline) = self.buf.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };
        let rest = self.buf.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buf, rest);

        complete
            .split(|&b| b == b'\n')
            .filter_map(|line| {
                let line = String::from_utf8_lossy(line);
                line.trim().strip_prefix(DATA_PREFIX).map(str::to_owned)
            })
            .collect()
    }
}

/// Classify one framed payload.
///
/// `[DONE]` ends the stream; JSON with a textual `content` field yields that
/// text; anything else that isn't valid JSON is forwarded verbatim rather
/// than dropped. JSON lacking `content` (e.g. server-side error envelopes)
/// and empty payloads produce nothing.
pub(crate) fn parse_payload(payload: &str) -> Option<ChatEvent> {
    if payload == DONE_SENTINEL {
        return Some(ChatEvent::Done);
    }
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => {
            let content = value.get("content").and_then(|c| c.as_str())?;
            Some(ChatEvent::Fragment(content.to_string()))
        }
        Err(_) => {
            if payload.is_empty() {
                None
            } else {
                warn!(payload, "chat stream payload is not JSON, forwarding as text");
                Some(ChatEvent::Fragment(payload.to_string()))
            }
        }
    }
}
