//! Pipeline stages
//!
//! The fixed, ordered set of columns an appointment card can occupy. The
//! wire names returned by [`PipelineStage::as_str`] are shared with the tool
//! layer and must not drift from it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Rejection;

/// A column of the appointment pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Request received, first contact pending
    New,
    /// Clarifying complaint, contraindications and preparation
    Triage,
    /// Visit time agreed with the patient
    Scheduled,
    /// Patient has been seen
    Completed,
}

impl PipelineStage {
    /// All stages in pipeline order
    pub const ALL: [PipelineStage; 4] = [
        PipelineStage::New,
        PipelineStage::Triage,
        PipelineStage::Scheduled,
        PipelineStage::Completed,
    ];

    /// Wire name of the stage
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Triage => "triage",
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
        }
    }

    /// Column title shown on the board
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::New => "New requests",
            Self::Triage => "Clarifying details",
            Self::Scheduled => "Visit scheduled",
            Self::Completed => "Visit completed",
        }
    }

    /// One-line hint shown under the column title
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::New => "Request received, first contact required",
            Self::Triage => "Confirming complaint, contraindications and preparation",
            Self::Scheduled => "Time agreed, reminding the patient about preparation",
            Self::Completed => "Patient was seen, follow-up call pending",
        }
    }

    /// Position of the stage in the pipeline, starting at zero
    #[must_use]
    pub fn position(&self) -> usize {
        *self as usize
    }

    /// Whether the UI treats this stage as the end of the pipeline
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PipelineStage {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| Rejection::InvalidStage(s.to_string()))
    }
}
