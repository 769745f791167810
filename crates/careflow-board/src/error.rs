//! Error types for careflow-board
//!
//! [`Error`] covers failures of the board tool layer. [`Rejection`] is not an
//! error in the propagating sense: it is the value produced when an action
//! event is refused, so the store can stay untouched and the caller can log it.

use thiserror::Error;

/// Board error type
#[derive(Debug, Error)]
pub enum Error {
    /// Tool name is not one of the board tools
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments failed validation
    #[error("invalid argument `{field}`: {message}")]
    InvalidArgument {
        /// Argument name
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for board operations
pub type Result<T> = std::result::Result<T, Error>;

/// Why an action event was refused by the board
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    /// A required field was absent or empty
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Stage is outside the pipeline enumeration
    #[error("invalid stage: {0}")]
    InvalidStage(String),

    /// Event targets a card that is not on the board
    #[error("unknown card: {0}")]
    UnknownCard(String),

    /// Note event without note text
    #[error("empty note for card: {0}")]
    EmptyNote(String),

    /// Payload could not be decoded
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl Rejection {
    /// Stable code for logs and API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidStage(_) => "invalid_stage",
            Self::UnknownCard(_) => "unknown_card",
            Self::EmptyNote(_) => "empty_note",
            Self::Malformed(_) => "malformed",
        }
    }
}
