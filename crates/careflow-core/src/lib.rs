//! Careflow Core - Multi-agent chat runtime
//!
//! This crate keeps one conversation session per agent and feeds the
//! visible one into the shared appointment board:
//! - Transcript: Messages, parts and streaming status
//! - Extractor: Finding board actions in tool results
//! - Ledger: At-most-once consumption of call ids
//! - Feed: Transcript to board pipeline with per-thread cursors
//! - Slot: Per-agent session with the thread-presence invariant
//! - Multiplexer: Slot registry with a single visible slot
//! - Directory: Agent list, fallback agents and starter prompts
//! - Transport: Chat backend interface
//! - Threads: Thread creation interface
//! - Context: System prompt binding

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod directory;
pub mod error;
pub mod extractor;
pub mod feed;
pub mod ledger;
pub mod multiplexer;
pub mod slot;
pub mod threads;
pub mod transcript;
pub mod transport;

// Re-export main types
pub use context::ModelContext;
pub use directory::{
    fallback_agents, thread_suggestions, AgentDescriptor, AgentDirectory, HttpAgentDirectory,
    StaticAgentDirectory, ThreadSuggestion,
};
pub use error::{Error, Result};
pub use extractor::{extract, ExtractedEvent};
pub use feed::{follow, BoardFeed, FeedEntry, FeedReport};
pub use ledger::DedupLedger;
pub use multiplexer::{MultiplexerConfig, RuntimeMultiplexer};
pub use slot::{Activation, RuntimeSlot, SlotPhase, TurnSummary};
pub use threads::{LocalThreadProvider, ThreadProvider};
pub use transcript::{MessagePart, MessageRole, MessageStatus, Transcript, TranscriptMessage};
pub use transport::{
    AgentTransport, ChatRequest, ChatTransport, HttpChatTransport, MessageStream, OfflineTransport,
};
