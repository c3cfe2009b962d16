//! HTTP client for the SweetTalk backend.
//!
//! Phrase endpoints are ordinary request/response JSON calls. The chat
//! endpoint streams; [`ApiClient::stream_chat`] spawns a pump task that
//! decodes the body incrementally and delivers [`ChatEvent`]s on a channel,
//! so the caller's event loop stays responsive between reads.

mod sse;

use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use sweettalk_protocol::{Category, ChatEvent, ChatRequest, Phrase, PhraseQuery};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use sse::{parse_payload, SseDecoder};

/// Buffer size for the chat event channel.
const EVENT_BUFFER_SIZE: usize = 32;

/// Client for the SweetTalk backend API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Create a client with the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// List phrases, optionally filtered and paginated.
    pub async fn phrases(&self, query: &PhraseQuery) -> ClientResult<Vec<Phrase>> {
        let url = format!("{}/api/phrases", self.config.base_url());
        let response = self
            .http
            .get(&url)
            .query(&query.to_params())
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        handle_response(response, "fetch phrases").await
    }

    /// Fetch one random phrase, optionally from a single category.
    pub async fn random_phrase(&self, category: Option<&str>) -> ClientResult<Phrase> {
        let url = format!("{}/api/phrases/random", self.config.base_url());
        let mut request = self.http.get(&url).timeout(self.config.request_timeout());
        if let Some(category) = category {
            request = request.query(&[("category", category)]);
        }
        let response = request.send().await?;

        handle_response(response, "fetch random phrase").await
    }

    /// List categories with their phrase counts.
    pub async fn categories(&self) -> ClientResult<Vec<Category>> {
        let url = format!("{}/api/phrases/categories", self.config.base_url());
        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout())
            .send()
            .await?;

        handle_response(response, "fetch categories").await
    }

    /// Send one chat turn and stream the reply.
    ///
    /// All outcomes arrive on the returned channel: zero or more
    /// [`ChatEvent::Fragment`]s followed by exactly one terminal event.
    /// There are no retries and no client-side timeout; dropping the
    /// receiver abandons the request without further effect.
    ///
    /// The request is not validated here beyond what the wire call needs;
    /// callers are responsible for [`ChatRequest::has_payload`].
    pub fn stream_chat(&self, request: ChatRequest) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER_SIZE);
        let http = self.http.clone();
        let url = format!("{}/api/chat", self.config.base_url());

        tokio::spawn(async move {
            debug!(%url, style = ?request.style, "sending chat request");

            let response = match http.post(&url).json(&request).send().await {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "chat request failed to send");
                    let _ = tx.send(ChatEvent::Failed(format!("chat request failed: {e}"))).await;
                    return;
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!(%status, "chat request rejected");
                let _ = tx
                    .send(ChatEvent::Failed(format!("chat request failed: {status}")))
                    .await;
                return;
            }

            pump_stream(response.bytes_stream(), &tx).await;
        });

        rx
    }
}

/// Drive one chat body stream to its terminal event.
///
/// Sends exactly one `Done` or `Failed`, with all fragments strictly before
/// it. `[DONE]` terminates the read immediately; stream EOF without the
/// sentinel also settles as `Done`; a read error settles as `Failed`.
async fn pump_stream<B, E>(
    stream: impl futures::Stream<Item = Result<B, E>>,
    tx: &mpsc::Sender<ChatEvent>,
) where
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut decoder = SseDecoder::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "chat stream read failed");
                let _ = tx
                    .send(ChatEvent::Failed(format!("chat stream read failed: {e}")))
                    .await;
                return;
            }
        };

        for payload in decoder.feed(chunk.as_ref()) {
            match parse_payload(&payload) {
                Some(ChatEvent::Done) => {
                    let _ = tx.send(ChatEvent::Done).await;
                    return;
                }
                Some(event) => {
                    if tx.send(event).await.is_err() {
                        // Receiver gone; abandon the stream.
                        return;
                    }
                }
                None => {}
            }
        }
    }

    debug!("chat stream ended without sentinel");
    let _ = tx.send(ChatEvent::Done).await;
}

/// Parse a success response as JSON, or map the status to an error.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
    endpoint: &'static str,
) -> ClientResult<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Status { endpoint, status });
    }
    response
        .json()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}
