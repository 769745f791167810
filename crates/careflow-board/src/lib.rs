//! Careflow Board - Appointment Pipeline
//!
//! This crate provides the shared appointment board driven by agent tool calls:
//! - Stage: The fixed, ordered pipeline columns
//! - Card: Appointment card type
//! - Action: Wire contract for board events and boundary decoding
//! - Store: The board itself and its projections
//! - Reducer: Applying action events to the board
//! - Highlight: Expiring "just changed" marker
//! - Tools: Tool definitions that produce board events
//! - Error: Error and rejection types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action;
pub mod card;
pub mod error;
pub mod highlight;
pub mod reducer;
pub mod stage;
pub mod store;
pub mod tools;

// Re-export main types
pub use action::{decode, ActionEvent, Decoded};
pub use card::AppointmentCard;
pub use error::{Error, Rejection, Result};
pub use highlight::{HighlightTimer, DEFAULT_HIGHLIGHT_DURATION};
pub use reducer::{reduce, Outcome};
pub use stage::PipelineStage;
pub use store::{BoardStore, StageCount, DEFAULT_SNAPSHOT_LIMIT};
pub use tools::ToolDefinition;
