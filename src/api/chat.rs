//! Chat turns through the active runtime slot

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Extension, Router};
use careflow_core::{Transcript, TurnSummary};
use serde::Deserialize;

use super::{status_for, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub struct ChatInput {
    pub text: String,
}

async fn send_message(
    Extension(state): Extension<AppState>,
    Json(input): Json<ChatInput>,
) -> (StatusCode, Json<ApiResponse<TurnSummary>>) {
    match state.multiplexer.send(&input.text).await {
        Ok(summary) => (StatusCode::OK, Json(ApiResponse::success(summary))),
        Err(e) => (status_for(&e), Json(ApiResponse::error(&e))),
    }
}

/// Visible transcript
async fn transcript(Extension(state): Extension<AppState>) -> Json<Transcript> {
    Json(state.multiplexer.visible())
}

/// Create chat routes
pub fn chat_routes() -> Router {
    Router::new()
        .route("/api/chat", post(send_message))
        .route("/api/chat/transcript", get(transcript))
}
