//! Board Feed
//!
//! Connects the visible transcript to the board: extractor, ledger, reducer
//! and highlight timer in one place. Each thread keeps its own ledger and a
//! cursor to the first message that may still change, so settled messages
//! are scanned once.
//!
//! Progress for a thread is dropped only when that thread is seen with an
//! empty transcript. Threads are never deleted by the runtime, so the number
//! of tracked threads grows with the threads opened during the process
//! lifetime; each entry holds only the call ids consumed on that thread.

use std::collections::HashMap;
use std::sync::Arc;

use careflow_board::{BoardStore, HighlightTimer, Outcome};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::extractor::extract;
use crate::ledger::DedupLedger;
use crate::transcript::Transcript;

#[derive(Debug, Default)]
struct ThreadProgress {
    ledger: DedupLedger,
    cursor: usize,
}

/// Outcome of one consumed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// Originating call id
    pub call_id: String,
    /// What the reducer did with it
    pub outcome: Outcome,
}

/// Result of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Thread that was synced
    pub thread_id: String,
    /// Calls consumed in this pass, in transcript order
    pub entries: Vec<FeedEntry>,
    /// Whether the thread's ledger was reset (empty transcript)
    pub reset: bool,
}

impl FeedReport {
    /// Whether nothing was consumed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries that changed the board
    #[must_use]
    pub fn applied(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_applied()).count()
    }

    /// Last card the pass touched
    #[must_use]
    pub fn last_touched(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|e| e.outcome.touched())
    }
}

/// The shared board with its per-thread consumption state
pub struct BoardFeed {
    board: BoardStore,
    threads: HashMap<String, ThreadProgress>,
    highlight: HighlightTimer,
}

impl BoardFeed {
    /// Create a feed over `board`
    #[must_use]
    pub fn new(board: BoardStore, highlight: HighlightTimer) -> Self {
        Self {
            board,
            threads: HashMap::new(),
            highlight,
        }
    }

    /// Current board
    #[must_use]
    pub fn board(&self) -> &BoardStore {
        &self.board
    }

    /// Highlight timer driven by this feed
    #[must_use]
    pub fn highlight(&self) -> &HighlightTimer {
        &self.highlight
    }

    /// Ledger of a thread, if it was synced before
    #[must_use]
    pub fn ledger(&self, thread_id: &str) -> Option<&DedupLedger> {
        self.threads.get(thread_id).map(|p| &p.ledger)
    }

    /// Index of the first message of a thread that will be rescanned
    #[must_use]
    pub fn cursor(&self, thread_id: &str) -> usize {
        self.threads.get(thread_id).map_or(0, |p| p.cursor)
    }

    /// Number of threads with consumption state
    #[must_use]
    pub fn tracked_threads(&self) -> usize {
        self.threads.len()
    }

    /// Consume new board actions from a transcript snapshot.
    ///
    /// Must be called from within a Tokio runtime (the highlight timer
    /// spawns its expiry task).
    pub fn sync(&mut self, transcript: &Transcript) -> FeedReport {
        let thread_id = transcript.thread_id.clone();

        if transcript.is_empty() {
            let reset = self.threads.remove(&thread_id).is_some();
            if reset {
                debug!(thread_id = %thread_id, "Transcript empty, ledger reset");
            }
            return FeedReport {
                thread_id,
                entries: Vec::new(),
                reset,
            };
        }

        let progress = self.threads.entry(thread_id.clone()).or_default();
        if progress.cursor > transcript.len() {
            // History was rewritten under us; rescan, the ledger still guards
            progress.cursor = 0;
        }

        let mut entries = Vec::new();
        for event in extract(&transcript.messages, progress.cursor, &progress.ledger) {
            if !progress.ledger.mark_seen(event.call_id.clone()) {
                continue;
            }
            let outcome = match &event.decoded {
                Ok(action) => self.board.apply(action),
                Err(rejection) => {
                    warn!(
                        call_id = %event.call_id,
                        code = rejection.code(),
                        "Rejected board action: {}",
                        rejection
                    );
                    Outcome::Rejected(rejection.clone())
                }
            };
            if let Some(card_id) = outcome.touched() {
                self.highlight.touch(Some(card_id));
            }
            entries.push(FeedEntry {
                call_id: event.call_id,
                outcome,
            });
        }

        let from = progress.cursor;
        progress.cursor = transcript.messages[from..]
            .iter()
            .position(|m| !m.is_settled())
            .map_or(transcript.len(), |offset| from + offset);

        if !entries.is_empty() {
            debug!(
                thread_id = %thread_id,
                consumed = entries.len(),
                cursor = progress.cursor,
                "Board feed synced"
            );
        }

        FeedReport {
            thread_id,
            entries,
            reset: false,
        }
    }
}

/// Sync `feed` with every transcript published on `transcripts` until the
/// sender is dropped. `on_report` runs after each pass while the feed is
/// still locked.
pub fn follow<F>(
    feed: Arc<Mutex<BoardFeed>>,
    mut transcripts: watch::Receiver<Transcript>,
    mut on_report: F,
) -> JoinHandle<()>
where
    F: FnMut(&BoardFeed, &FeedReport) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let transcript = transcripts.borrow_and_update().clone();
            {
                let mut feed = feed.lock().await;
                let report = feed.sync(&transcript);
                on_report(&feed, &report);
            }
            if transcripts.changed().await.is_err() {
                debug!("Transcript source closed, board feed stopped");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{MessagePart, MessageStatus, TranscriptMessage};
    use careflow_board::{PipelineStage, Rejection};
    use serde_json::{json, Value};
    use std::time::Duration;

    fn feed() -> BoardFeed {
        BoardFeed::new(BoardStore::new(), HighlightTimer::default())
    }

    fn tool(call_id: &str, result: Value) -> TranscriptMessage {
        TranscriptMessage::assistant(vec![MessagePart::tool_result(call_id, "board", result)])
    }

    fn create(id: &str) -> Value {
        json!({
            "action": "create",
            "item": {"id": id, "patient": "Anna", "doctor": "Therapist", "service": "Checkup", "column": "new"}
        })
    }

    fn transcript(messages: Vec<TranscriptMessage>) -> Transcript {
        Transcript {
            thread_id: "thread-1".to_string(),
            messages,
        }
    }

    #[tokio::test]
    async fn test_sync_applies_and_highlights() {
        let mut feed = feed();
        let report = feed.sync(&transcript(vec![
            TranscriptMessage::user("add Anna"),
            tool("call_1", create("appt-1")),
        ]));

        assert_eq!(report.applied(), 1);
        assert_eq!(report.last_touched(), Some("appt-1"));
        assert_eq!(feed.board().len(), 1);
        assert_eq!(feed.highlight().current().as_deref(), Some("appt-1"));
        assert_eq!(feed.cursor("thread-1"), 2);
    }

    #[tokio::test]
    async fn test_rescan_does_not_reapply() {
        let mut feed = feed();
        let snapshot = transcript(vec![
            tool("call_1", create("appt-1")),
            tool(
                "call_2",
                json!({"action": "move", "id": "appt-1", "column": "triage"}),
            ),
        ]);
        feed.sync(&snapshot);
        let second = feed.sync(&snapshot);

        assert!(second.is_empty());
        assert_eq!(feed.board().card("appt-1").unwrap().stage, PipelineStage::Triage);
    }

    #[tokio::test]
    async fn test_streaming_message_is_rescanned_until_settled() {
        let mut feed = feed();
        let mut streaming = TranscriptMessage::assistant(vec![MessagePart::pending_tool_call(
            "call_1",
            "create-appointment",
        )])
        .with_id("m1")
        .with_status(MessageStatus::Running);

        let first = feed.sync(&transcript(vec![streaming.clone()]));
        assert!(first.is_empty());
        assert_eq!(feed.cursor("thread-1"), 0);

        streaming.parts = vec![MessagePart::tool_result("call_1", "create-appointment", create("appt-1"))];
        let second = feed.sync(&transcript(vec![streaming.clone()]));
        assert_eq!(second.applied(), 1);

        streaming.status = MessageStatus::Complete;
        let third = feed.sync(&transcript(vec![streaming]));
        assert!(third.is_empty());
        assert_eq!(feed.cursor("thread-1"), 1);
        assert_eq!(feed.board().len(), 1);
    }

    #[tokio::test]
    async fn test_rejections_are_reported_once() {
        let mut feed = feed();
        let snapshot = transcript(vec![tool(
            "call_1",
            json!({"action": "note", "id": "missing", "note": "call back"}),
        )]);

        let report = feed.sync(&snapshot);
        assert_eq!(
            report.entries[0].outcome,
            Outcome::Rejected(Rejection::UnknownCard("missing".into()))
        );
        assert!(feed.board().is_empty());
        assert!(feed.highlight().current().is_none());
        assert!(feed.sync(&snapshot).is_empty());
    }

    #[tokio::test]
    async fn test_empty_transcript_resets_ledger() {
        let mut feed = feed();
        feed.sync(&transcript(vec![tool("call_1", create("appt-1"))]));
        assert!(feed.ledger("thread-1").unwrap().has_seen("call_1"));

        let report = feed.sync(&transcript(Vec::new()));
        assert!(report.reset);
        assert!(feed.ledger("thread-1").is_none());
        assert_eq!(feed.cursor("thread-1"), 0);
    }

    #[tokio::test]
    async fn test_threads_keep_separate_ledgers() {
        let mut feed = feed();
        feed.sync(&transcript(vec![tool("call_1", create("appt-1"))]));

        let other = Transcript {
            thread_id: "thread-2".to_string(),
            messages: vec![tool("call_1", create("appt-2"))],
        };
        let report = feed.sync(&other);
        assert_eq!(report.applied(), 1);
        assert_eq!(feed.board().len(), 2);
        assert_eq!(feed.tracked_threads(), 2);

        feed.sync(&Transcript {
            thread_id: "thread-2".to_string(),
            messages: Vec::new(),
        });
        assert_eq!(feed.tracked_threads(), 1);
        assert!(feed.ledger("thread-1").is_some());
    }

    #[tokio::test]
    async fn test_follow_syncs_published_transcripts() {
        let feed = Arc::new(Mutex::new(feed()));
        let (tx, rx) = watch::channel(Transcript::default());
        let (report_tx, mut report_rx) = tokio::sync::mpsc::unbounded_channel();

        let handle = follow(Arc::clone(&feed), rx, move |_, report| {
            if !report.is_empty() {
                let _ = report_tx.send(report.applied());
            }
        });

        tx.send_replace(transcript(vec![tool("call_1", create("appt-1"))]));
        let applied = tokio::time::timeout(Duration::from_secs(1), report_rx.recv())
            .await
            .unwrap();
        assert_eq!(applied, Some(1));
        assert!(feed.lock().await.board().contains("appt-1"));

        drop(tx);
        handle.await.unwrap();
    }
}
