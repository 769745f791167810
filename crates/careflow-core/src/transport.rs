//! Chat transport
//!
//! Sends a turn to the agent backend and yields the assistant message as it
//! grows. Each yielded item is a full snapshot of the message so far; the
//! slot replaces its copy by message id.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::transcript::TranscriptMessage;

/// Stream of assistant message snapshots
pub type MessageStream = BoxStream<'static, Result<TranscriptMessage>>;

/// Outgoing turn, including the side channel the backend routes on
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// Agent that should answer
    pub agent_id: String,
    /// Conversation thread
    pub thread_id: String,
    /// Full message history including the new user message
    pub messages: Vec<TranscriptMessage>,
    /// Composed system text, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

/// Backend that answers chat turns
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Start a turn
    async fn send(&self, request: ChatRequest) -> Result<MessageStream>;
}

/// Transport handle owned by one runtime slot; stamps its agent id on every
/// request.
#[derive(Clone)]
pub struct AgentTransport {
    agent_id: String,
    inner: Arc<dyn ChatTransport>,
}

impl AgentTransport {
    /// Bind `inner` to `agent_id`
    #[must_use]
    pub fn new(agent_id: impl Into<String>, inner: Arc<dyn ChatTransport>) -> Self {
        Self {
            agent_id: agent_id.into(),
            inner,
        }
    }

    /// Agent this handle sends for
    #[must_use]
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Send a turn on `thread_id`
    pub async fn send(
        &self,
        thread_id: &str,
        messages: Vec<TranscriptMessage>,
        system: Option<String>,
    ) -> Result<MessageStream> {
        let request = ChatRequest {
            agent_id: self.agent_id.clone(),
            thread_id: thread_id.to_string(),
            messages,
            system,
        };
        self.inner.send(request).await
    }
}

impl std::fmt::Debug for AgentTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTransport")
            .field("agent_id", &self.agent_id)
            .finish_non_exhaustive()
    }
}

/// Transport used when no chat backend is configured; every turn fails
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTransport;

#[async_trait]
impl ChatTransport for OfflineTransport {
    async fn send(&self, _request: ChatRequest) -> Result<MessageStream> {
        Err(Error::transport("no chat backend configured"))
    }
}

/// Posts turns to `{base_url}/api/chat` and reads newline-delimited JSON
/// message snapshots from the response body.
///
/// A reply may stream for as long as the model runs, so there is no limit
/// on the whole request: only connecting and each gap between chunks are
/// bounded.
pub struct HttpChatTransport {
    client: Client,
    url: String,
}

impl HttpChatTransport {
    /// Create a transport client
    pub fn new(base_url: &str, connect_timeout: Duration, idle_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .read_timeout(idle_timeout)
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}/api/chat", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ChatTransport for HttpChatTransport {
    async fn send(&self, request: ChatRequest) -> Result<MessageStream> {
        if request.messages.is_empty() {
            return Err(Error::transport("messages payload is required"));
        }
        debug!(
            agent_id = %request.agent_id,
            thread_id = %request.thread_id,
            messages = request.messages.len(),
            "Sending chat turn"
        );

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transport(format!("chat backend returned status {status}")));
        }

        Ok(ndjson_messages(response.bytes_stream()))
    }
}

/// Split a byte stream into newline-delimited message snapshots
fn ndjson_messages<S, B, E>(bytes: S) -> MessageStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = (Box::pin(bytes), Vec::<u8>::new(), false);

    stream::unfold(state, |(mut bytes, mut buffer, mut done)| async move {
        loop {
            if let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                if line.iter().all(u8::is_ascii_whitespace) {
                    continue;
                }
                let item: Result<TranscriptMessage> =
                    serde_json::from_slice(&line).map_err(Error::from);
                return Some((item, (bytes, buffer, done)));
            }

            if done {
                if buffer.iter().all(u8::is_ascii_whitespace) {
                    return None;
                }
                let rest = std::mem::take(&mut buffer);
                let item: Result<TranscriptMessage> =
                    serde_json::from_slice(&rest).map_err(Error::from);
                return Some((item, (bytes, buffer, done)));
            }

            match bytes.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    buffer.clear();
                    return Some((Err(Error::transport(e.to_string())), (bytes, buffer, true)));
                }
                None => done = true,
            }
        }
    })
    .boxed()
}
