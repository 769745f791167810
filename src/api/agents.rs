//! Agent listing and selection

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::{Extension, Router};
use careflow_core::{thread_suggestions, AgentDescriptor, SlotPhase, ThreadSuggestion};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{status_for, ApiResponse, AppState};

/// Agent selector contents
#[derive(Debug, Serialize)]
pub struct AgentsView {
    pub agents: Vec<AgentDescriptor>,
    pub active_id: String,
    /// Starter prompts for the active agent
    pub suggestions: &'static [ThreadSuggestion],
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub agent_id: String,
}

/// State of the slot that became visible
#[derive(Debug, Serialize)]
pub struct SelectView {
    pub active_id: String,
    pub phase: SlotPhase,
    pub thread_id: Option<String>,
}

async fn list_agents(Extension(state): Extension<AppState>) -> Json<AgentsView> {
    let active_id = state.multiplexer.active_id().await;
    Json(AgentsView {
        agents: state.multiplexer.agents().await,
        suggestions: thread_suggestions(&active_id),
        active_id,
    })
}

async fn select_agent(
    Extension(state): Extension<AppState>,
    Json(request): Json<SelectRequest>,
) -> (StatusCode, Json<ApiResponse<SelectView>>) {
    match state.multiplexer.select(&request.agent_id).await {
        Ok(slot) => {
            info!(agent_id = %request.agent_id, "Agent selected");
            state.refresh_instructions().await;
            let view = SelectView {
                active_id: slot.agent_id().to_string(),
                phase: slot.phase().await,
                thread_id: slot.current_thread().await,
            };
            (StatusCode::OK, Json(ApiResponse::success(view)))
        }
        Err(e) => (status_for(&e), Json(ApiResponse::error(&e))),
    }
}

/// Create agent routes
pub fn agents_routes() -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/agents/select", post(select_agent))
}
