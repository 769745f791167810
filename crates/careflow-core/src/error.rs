//! Error types for careflow-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Agent id is not in the directory (or not selectable)
    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    /// Thread id does not belong to the slot
    #[error("unknown thread: {0}")]
    UnknownThread(String),

    /// Creating a conversation thread failed
    #[error("thread creation failed for agent {agent_id}: {message}")]
    ThreadCreation {
        /// Agent whose slot tried to create the thread
        agent_id: String,
        /// Underlying failure
        message: String,
    },

    /// Input arrived before the slot had a thread
    #[error("no active thread for agent: {0}")]
    ThreadNotReady(String),

    /// Chat transport failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Agent directory could not be read
    #[error("agent directory error: {0}")]
    Directory(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a transport error
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a directory error
    #[must_use]
    pub fn directory(msg: impl Into<String>) -> Self {
        Self::Directory(msg.into())
    }

    /// Create a thread creation error
    #[must_use]
    pub fn thread_creation(agent_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ThreadCreation {
            agent_id: agent_id.into(),
            message: msg.into(),
        }
    }

    /// Check if a later retry may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::ThreadCreation { .. } | Self::Directory(_)
        )
    }

    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownAgent(_) => "unknown_agent",
            Self::UnknownThread(_) => "unknown_thread",
            Self::ThreadCreation { .. } => "thread_creation_failed",
            Self::ThreadNotReady(_) => "thread_not_ready",
            Self::Transport(_) => "transport_error",
            Self::Directory(_) => "directory_error",
            Self::Serialization(_) => "serialization_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Directory(err.to_string())
    }
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;
