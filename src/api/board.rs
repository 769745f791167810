//! Board state and transcript synchronisation

use axum::response::Json;
use axum::routing::{get, post};
use axum::{Extension, Router};
use careflow_board::{AppointmentCard, Outcome, StageCount};
use careflow_core::{FeedReport, Transcript};
use serde::Serialize;

use super::AppState;

/// Everything the board view renders
#[derive(Debug, Serialize)]
pub struct BoardView {
    pub cards: Vec<AppointmentCard>,
    pub stages: Vec<StageCount>,
    pub next_scheduled: Option<AppointmentCard>,
    /// Card touched within the highlight window
    pub highlighted: Option<AppointmentCard>,
}

/// One consumed call
#[derive(Debug, Serialize)]
pub struct SyncEntry {
    pub call_id: String,
    /// `applied`, `duplicate` or `rejected`
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub thread_id: String,
    pub reset: bool,
    pub entries: Vec<SyncEntry>,
}

impl From<&FeedReport> for SyncResponse {
    fn from(report: &FeedReport) -> Self {
        let entries = report
            .entries
            .iter()
            .map(|entry| {
                let (status, card_id, code, reason) = match &entry.outcome {
                    Outcome::Applied { card_id } => ("applied", Some(card_id.clone()), None, None),
                    Outcome::Duplicate { card_id } => {
                        ("duplicate", Some(card_id.clone()), None, None)
                    }
                    Outcome::Rejected(rejection) => (
                        "rejected",
                        None,
                        Some(rejection.code()),
                        Some(rejection.to_string()),
                    ),
                };
                SyncEntry {
                    call_id: entry.call_id.clone(),
                    status,
                    card_id,
                    code,
                    reason,
                }
            })
            .collect();

        Self {
            thread_id: report.thread_id.clone(),
            reset: report.reset,
            entries,
        }
    }
}

async fn get_board(Extension(state): Extension<AppState>) -> Json<BoardView> {
    let feed = state.feed.lock().await;
    let board = feed.board();
    let highlighted = feed
        .highlight()
        .current()
        .and_then(|id| board.card(&id).cloned());

    Json(BoardView {
        cards: board.cards().to_vec(),
        stages: board.stage_counts(),
        next_scheduled: board.next_scheduled().cloned(),
        highlighted,
    })
}

/// Feed a client-side transcript snapshot into the board
async fn sync_transcript(
    Extension(state): Extension<AppState>,
    Json(transcript): Json<Transcript>,
) -> Json<SyncResponse> {
    let response = {
        let mut feed = state.feed.lock().await;
        SyncResponse::from(&feed.sync(&transcript))
    };
    if response.entries.iter().any(|e| e.status == "applied") {
        state.refresh_instructions().await;
    }
    Json(response)
}

/// Create board routes
pub fn board_routes() -> Router {
    Router::new()
        .route("/api/board", get(get_board))
        .route("/api/board/sync", post(sync_transcript))
}
