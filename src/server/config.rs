//! Server configuration types

use std::time::Duration;

use careflow_board::{BoardStore, HighlightTimer, DEFAULT_SNAPSHOT_LIMIT};
use careflow_core::MultiplexerConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub board: BoardConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

/// Agent selection and backend endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_agent")]
    pub default_agent: String,
    #[serde(default)]
    pub selectable: Option<Vec<String>>,
    #[serde(default)]
    pub directory_url: Option<String>,
    #[serde(default)]
    pub chat_url: Option<String>,
    /// Whole-request limit for directory calls, connect limit for chat
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Longest silence tolerated between chunks of a streamed chat reply
    #[serde(default = "default_stream_idle_secs")]
    pub stream_idle_secs: u64,
}

fn default_agent() -> String {
    "defaultAgent".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_stream_idle_secs() -> u64 {
    120
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            default_agent: default_agent(),
            selectable: None,
            directory_url: None,
            chat_url: None,
            request_timeout_secs: default_request_timeout_secs(),
            stream_idle_secs: default_stream_idle_secs(),
        }
    }
}

impl AgentsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stream_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.stream_idle_secs)
    }

    pub fn multiplexer_config(&self) -> MultiplexerConfig {
        MultiplexerConfig {
            default_agent: Some(self.default_agent.clone()),
            selectable: self.selectable.clone(),
        }
    }
}

/// Board behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default = "default_highlight_ms")]
    pub highlight_ms: u64,
    #[serde(default = "default_true")]
    pub seed_demo: bool,
    #[serde(default = "default_snapshot_limit")]
    pub snapshot_limit: usize,
}

fn default_highlight_ms() -> u64 {
    4000
}

fn default_true() -> bool {
    true
}

fn default_snapshot_limit() -> usize {
    DEFAULT_SNAPSHOT_LIMIT
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            highlight_ms: default_highlight_ms(),
            seed_demo: default_true(),
            snapshot_limit: default_snapshot_limit(),
        }
    }
}

impl BoardConfig {
    /// Initial board contents
    pub fn initial_board(&self) -> BoardStore {
        if self.seed_demo {
            BoardStore::demo()
        } else {
            BoardStore::new()
        }
    }

    pub fn highlight_timer(&self) -> HighlightTimer {
        HighlightTimer::new(Duration::from_millis(self.highlight_ms))
    }
}
