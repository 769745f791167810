//! Board tool endpoints
//!
//! GET /api/tools - Definitions of the board tools
//! POST /api/tools/:name - Run a board tool and return its action payload

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use careflow_board::tools::{definitions, execute};
use careflow_board::{Error as BoardError, ToolDefinition};
use serde_json::Value;
use tracing::debug;

use super::ApiResponse;

async fn list_tools() -> Json<ApiResponse<Vec<ToolDefinition>>> {
    Json(ApiResponse::success(definitions()))
}

/// The returned payload is what a chat backend records as the tool result
async fn run_tool(
    Path(name): Path<String>,
    Json(args): Json<Value>,
) -> (StatusCode, Json<ApiResponse<Value>>) {
    match execute(&name, &args) {
        Ok(payload) => (StatusCode::OK, Json(ApiResponse::success(payload))),
        Err(e) => {
            debug!(tool = %name, error = %e, "Board tool refused arguments");
            let status = match e {
                BoardError::UnknownTool(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            (status, Json(ApiResponse::failure(e.to_string(), e.code())))
        }
    }
}

/// Create tool routes
pub fn tools_routes() -> Router {
    Router::new()
        .route("/api/tools", get(list_tools))
        .route("/api/tools/:name", post(run_tool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use careflow_board::{decode, ActionEvent, Decoded};
    use serde_json::json;
    use tower::ServiceExt;

    async fn call(request: Request<Body>) -> (StatusCode, Value) {
        let response = tools_routes().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_args(name: &str, args: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/tools/{name}"))
            .header("content-type", "application/json")
            .body(Body::from(args.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_tools() {
        let request = Request::builder().uri("/api/tools").body(Body::empty()).unwrap();
        let (status, body) = call(request).await;

        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tool| tool["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "create-appointment",
                "update-appointment-stage",
                "upsert-appointment-note"
            ]
        );
    }

    #[tokio::test]
    async fn test_run_tool_returns_board_payload() {
        let (status, body) = call(post_args(
            "update-appointment-stage",
            json!({"id": "appt-3203", "status": "completed", "note": "  done  "}),
        ))
        .await;

        assert_eq!(status, StatusCode::OK);
        match decode(&body["data"]) {
            Decoded::Action(ActionEvent::Move { id, note, .. }) => {
                assert_eq!(id, "appt-3203");
                assert_eq!(note.as_deref(), Some("done"));
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_tool_errors() {
        let (status, body) = call(post_args("delete-everything", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "unknown_tool");

        let (status, body) = call(post_args(
            "upsert-appointment-note",
            json!({"id": "appt-1", "note": "x"}),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
    }
}
