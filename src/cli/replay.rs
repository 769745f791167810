//! `careflow replay`: feed a recorded transcript through the board feed.
//!
//! The transcript is replayed one message at a time, the way it grows while
//! streaming, so every prefix is scanned and dedup is exercised.

use std::path::Path;

use anyhow::{Context, Result};
use careflow_board::{BoardStore, Outcome};
use careflow_core::{BoardFeed, FeedEntry, Transcript, TranscriptMessage};
use serde::{Deserialize, Serialize};

use crate::server::load_config;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayInput {
    Transcript(Transcript),
    Messages(Vec<TranscriptMessage>),
}

impl From<ReplayInput> for Transcript {
    fn from(input: ReplayInput) -> Self {
        match input {
            ReplayInput::Transcript(transcript) => transcript,
            ReplayInput::Messages(messages) => Transcript {
                thread_id: "replay".to_string(),
                messages,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplayEntry {
    call_id: String,
    outcome: String,
}

#[derive(Debug, Serialize)]
struct ReplayResult {
    thread_id: String,
    entries: Vec<ReplayEntry>,
    board: BoardStore,
}

fn describe(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Applied { card_id } => format!("applied {card_id}"),
        Outcome::Duplicate { card_id } => format!("duplicate {card_id}"),
        Outcome::Rejected(rejection) => format!("rejected ({}): {}", rejection.code(), rejection),
    }
}

/// Replay `transcript` message by message
fn replay(feed: &mut BoardFeed, transcript: &Transcript) -> Vec<FeedEntry> {
    let mut entries = Vec::new();
    for end in 1..=transcript.len() {
        let prefix = Transcript {
            thread_id: transcript.thread_id.clone(),
            messages: transcript.messages[..end].to_vec(),
        };
        entries.extend(feed.sync(&prefix).entries);
    }
    entries
}

pub async fn run(path: &Path, json: bool) -> Result<()> {
    let config = load_config()?;
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let input: ReplayInput = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse transcript {}", path.display()))?;
    let transcript = Transcript::from(input);

    let mut feed = BoardFeed::new(config.board.initial_board(), config.board.highlight_timer());
    let entries = replay(&mut feed, &transcript);

    let result = ReplayResult {
        thread_id: transcript.thread_id.clone(),
        entries: entries
            .iter()
            .map(|e| ReplayEntry {
                call_id: e.call_id.clone(),
                outcome: describe(&e.outcome),
            })
            .collect(),
        board: feed.board().clone(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Replayed {} messages from thread {}", transcript.len(), result.thread_id);
    for entry in &result.entries {
        println!("  {:<16} {}", entry.call_id, entry.outcome);
    }
    println!();
    for count in feed.board().stage_counts() {
        println!("{} ({})", count.label, count.count);
        for card in feed.board().cards_in(count.stage) {
            println!("  {}", card.summary_line());
        }
    }
    if let Some(card) = feed.board().next_scheduled() {
        println!();
        println!("Next scheduled: {} at {}", card.name, card.slot.as_deref().unwrap_or("-"));
    }
    Ok(())
}
