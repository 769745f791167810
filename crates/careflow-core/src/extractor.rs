//! Event Extractor
//!
//! Scans transcript messages for tool results carrying board actions.
//! Extraction is read-only: the caller marks call ids in the ledger.

use careflow_board::{decode, ActionEvent, Decoded, Rejection};
use serde_json::Value;
use tracing::trace;

use crate::ledger::DedupLedger;
use crate::transcript::{MessagePart, MessageRole, TranscriptMessage};

/// A board action found in the transcript
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedEvent {
    /// Call id of the originating tool call
    pub call_id: String,
    /// Index of the message that carried it
    pub message_index: usize,
    /// The validated action, or why it was refused
    pub decoded: Result<ActionEvent, Rejection>,
}

/// Extract events from `messages[from..]` whose call id is not in `ledger`.
///
/// Only assistant messages are scanned, and only tool calls whose result is
/// present. Results without a recognized `action` are skipped.
#[must_use]
pub fn extract(
    messages: &[TranscriptMessage],
    from: usize,
    ledger: &DedupLedger,
) -> Vec<ExtractedEvent> {
    let mut events = Vec::new();

    for (index, message) in messages.iter().enumerate().skip(from) {
        if message.role != MessageRole::Assistant {
            continue;
        }
        for (call_id, result) in tool_results(message) {
            if ledger.has_seen(call_id) || events.iter().any(|e: &ExtractedEvent| e.call_id == call_id) {
                continue;
            }
            let decoded = match decode(result) {
                Decoded::Action(event) => Ok(event),
                Decoded::Rejected(rejection) => Err(rejection),
                Decoded::Unrecognized => {
                    trace!(call_id = %call_id, "Skipping tool result without board action");
                    continue;
                }
            };
            events.push(ExtractedEvent {
                call_id: call_id.to_string(),
                message_index: index,
                decoded,
            });
        }
    }

    events
}

fn tool_results(message: &TranscriptMessage) -> impl Iterator<Item = (&str, &Value)> {
    message.parts.iter().filter_map(|part| match part {
        MessagePart::ToolCall {
            tool_call_id,
            result: Some(result),
            ..
        } => Some((tool_call_id.as_str(), result)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::MessageStatus;
    use careflow_board::PipelineStage;
    use serde_json::json;

    fn create_result(id: &str) -> Value {
        json!({
            "action": "create",
            "item": {"id": id, "patient": "Anna", "doctor": "Therapist", "service": "Checkup", "column": "new"}
        })
    }

    #[test]
    fn test_extracts_assistant_tool_results() {
        let messages = vec![
            TranscriptMessage::user("book Anna"),
            TranscriptMessage::assistant(vec![
                MessagePart::text("Done."),
                MessagePart::tool_result("call_1", "create-appointment", create_result("appt-1")),
            ]),
        ];

        let events = extract(&messages, 0, &DedupLedger::new());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].call_id, "call_1");
        assert_eq!(events[0].message_index, 1);
        match &events[0].decoded {
            Ok(ActionEvent::Create(card)) => assert_eq!(card.stage, PipelineStage::New),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_skips_seen_pending_and_foreign() {
        let mut ledger = DedupLedger::new();
        ledger.mark_seen("call_1");

        let messages = vec![
            TranscriptMessage::user("hi"),
            TranscriptMessage::assistant(vec![
                MessagePart::tool_result("call_1", "create-appointment", create_result("appt-1")),
                MessagePart::pending_tool_call("call_2", "update-appointment-stage"),
                MessagePart::tool_result("call_3", "weather", json!({"temp": 3})),
            ])
            .with_status(MessageStatus::Running),
        ];

        assert!(extract(&messages, 0, &ledger).is_empty());
    }

    #[test]
    fn test_ignores_user_messages_with_results() {
        let mut user = TranscriptMessage::user("x");
        user.parts
            .push(MessagePart::tool_result("call_1", "t", create_result("appt-1")));
        assert!(extract(&[user], 0, &DedupLedger::new()).is_empty());
    }

    #[test]
    fn test_malformed_becomes_rejection() {
        let messages = vec![TranscriptMessage::assistant(vec![MessagePart::tool_result(
            "call_9",
            "update-appointment-stage",
            json!({"action": "move", "id": "appt-1", "column": "archived"}),
        )])];

        let events = extract(&messages, 0, &DedupLedger::new());
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0].decoded, Err(Rejection::InvalidStage(_))));
    }

    #[test]
    fn test_from_offset() {
        let messages = vec![
            TranscriptMessage::assistant(vec![MessagePart::tool_result(
                "call_1",
                "create-appointment",
                create_result("appt-1"),
            )]),
            TranscriptMessage::assistant(vec![MessagePart::tool_result(
                "call_2",
                "create-appointment",
                create_result("appt-2"),
            )]),
        ];

        let events = extract(&messages, 1, &DedupLedger::new());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].call_id, "call_2");
    }
}
