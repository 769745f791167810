//! Transcript model
//!
//! The message list of one conversation thread as the session layer exposes
//! it. Assistant messages are replaced in place while they stream, so a
//! message with a given id can be seen several times with growing content.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Author of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
}

impl MessageRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Streaming state of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Still receiving content
    Running,
    /// Fully received
    #[default]
    Complete,
    /// Stopped early (transport failure or cancellation)
    Incomplete,
}

/// One content part of a message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessagePart {
    /// Plain text
    Text {
        /// Text content
        text: String,
    },
    /// Tool invocation, with its result once the tool returned
    ToolCall {
        /// Call identifier, unique within a thread
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        /// Tool name
        #[serde(rename = "toolName")]
        tool_name: String,
        /// Call arguments
        #[serde(default)]
        args: Value,
        /// Tool result, absent while the call is in flight
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    /// Inline error shown inside the affected message
    Error {
        /// Error description
        message: String,
    },
}

impl MessagePart {
    /// Create a text part
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a tool call part that already carries its result
    #[must_use]
    pub fn tool_result(call_id: impl Into<String>, tool_name: impl Into<String>, result: Value) -> Self {
        Self::ToolCall {
            tool_call_id: call_id.into(),
            tool_name: tool_name.into(),
            args: Value::Null,
            result: Some(result),
        }
    }

    /// Create a tool call part still waiting for its result
    #[must_use]
    pub fn pending_tool_call(call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::ToolCall {
            tool_call_id: call_id.into(),
            tool_name: tool_name.into(),
            args: Value::Null,
            result: None,
        }
    }
}

/// A message in a conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Message id, stable while the message streams
    pub id: String,
    /// Author
    pub role: MessageRole,
    /// Content parts in order
    #[serde(default, rename = "content")]
    pub parts: Vec<MessagePart>,
    /// Streaming state
    #[serde(default)]
    pub status: MessageStatus,
    /// When the message was created
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl TranscriptMessage {
    fn new(role: MessageRole, parts: Vec<MessagePart>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            parts,
            status: MessageStatus::Complete,
            created_at: Utc::now(),
        }
    }

    /// Create a user text message
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![MessagePart::text(text)])
    }

    /// Create a complete assistant message
    #[must_use]
    pub fn assistant(parts: Vec<MessagePart>) -> Self {
        Self::new(MessageRole::Assistant, parts)
    }

    /// Create an assistant message carrying an inline error
    #[must_use]
    pub fn assistant_error(message: impl Into<String>) -> Self {
        let mut msg = Self::assistant(vec![MessagePart::Error {
            message: message.into(),
        }]);
        msg.status = MessageStatus::Incomplete;
        msg
    }

    /// Set a specific id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the streaming status
    #[must_use]
    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the message can no longer change
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.status != MessageStatus::Running
    }

    /// Concatenated text parts
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// The visible message list of one thread
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Thread the messages belong to; empty before any thread exists
    #[serde(default)]
    pub thread_id: String,
    /// Messages in order
    #[serde(default)]
    pub messages: Vec<TranscriptMessage>,
}

impl Transcript {
    /// Create an empty transcript for a thread
    #[must_use]
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            messages: Vec::new(),
        }
    }

    /// Whether there are no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Append a message, or replace the message with the same id
    pub fn upsert(&mut self, message: TranscriptMessage) {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(existing) => *existing = message,
            None => self.messages.push(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_upsert_replaces_streaming_message() {
        let mut transcript = Transcript::new("t1");
        transcript.upsert(TranscriptMessage::user("hi"));
        let partial = TranscriptMessage::assistant(vec![MessagePart::text("Hel")])
            .with_id("m1")
            .with_status(MessageStatus::Running);
        transcript.upsert(partial);
        transcript.upsert(
            TranscriptMessage::assistant(vec![MessagePart::text("Hello")]).with_id("m1"),
        );

        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages[1].text(), "Hello");
        assert!(transcript.messages[1].is_settled());
    }

    #[test]
    fn test_message_part_wire_format() {
        let part = MessagePart::tool_result("call_1", "create-appointment", json!({"action": "note"}));
        let value = serde_json::to_value(&part).unwrap();
        assert_eq!(value["type"], "tool-call");
        assert_eq!(value["toolCallId"], "call_1");
        assert_eq!(value["result"]["action"], "note");

        let pending = serde_json::to_value(MessagePart::pending_tool_call("c", "t")).unwrap();
        assert!(pending.get("result").is_none());
    }

    #[test]
    fn test_message_deserialize_defaults() {
        let msg: TranscriptMessage = serde_json::from_value(json!({
            "id": "m1",
            "role": "assistant",
            "content": [{"type": "text", "text": "ok"}]
        }))
        .unwrap();
        assert_eq!(msg.status, MessageStatus::Complete);
        assert_eq!(msg.text(), "ok");
    }

    #[test]
    fn test_assistant_error() {
        let msg = TranscriptMessage::assistant_error("connection reset");
        assert_eq!(msg.role, MessageRole::Assistant);
        assert_eq!(msg.status, MessageStatus::Incomplete);
        assert!(matches!(&msg.parts[0], MessagePart::Error { message } if message == "connection reset"));
    }
}
