//! Web API module for Careflow
//!
//! Provides REST API endpoints for:
//! - Health checks
//! - Agent listing and selection
//! - Chat turns through the active runtime slot
//! - Board state and transcript synchronisation
//! - Board tool definitions and execution

pub mod agents;
pub mod board;
pub mod chat;
pub mod health;
pub mod tools;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Extension, Router};
use careflow_core::{BoardFeed, Error as CoreError, RuntimeMultiplexer};
use serde::Serialize;
use tokio::sync::Mutex;

pub use agents::agents_routes;
pub use board::board_routes;
pub use chat::chat_routes;
pub use health::health_routes;
pub use tools::tools_routes;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<Mutex<BoardFeed>>,
    pub multiplexer: Arc<RuntimeMultiplexer>,
    pub snapshot_limit: usize,
}

impl AppState {
    /// Push the current board snapshot into the active slot's context
    pub async fn refresh_instructions(&self) {
        let snapshot = self
            .feed
            .lock()
            .await
            .board()
            .instruction_snapshot(self.snapshot_limit);
        self.multiplexer
            .set_board_instructions(Some(snapshot))
            .await;
    }
}

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(err: &CoreError) -> Self {
        Self::failure(err.to_string(), err.code())
    }

    pub fn failure(message: String, code: &'static str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            code: Some(code),
        }
    }
}

/// HTTP status for a core error
pub fn status_for(err: &CoreError) -> StatusCode {
    match err {
        CoreError::UnknownAgent(_) | CoreError::UnknownThread(_) => StatusCode::NOT_FOUND,
        CoreError::ThreadNotReady(_) => StatusCode::CONFLICT,
        CoreError::ThreadCreation { .. } | CoreError::Transport(_) | CoreError::Directory(_) => {
            StatusCode::BAD_GATEWAY
        }
        CoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Create the API router with all endpoints
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(health_routes())
        .merge(agents_routes())
        .merge(board_routes())
        .merge(chat_routes())
        .merge(tools_routes())
        .layer(Extension(state))
}
