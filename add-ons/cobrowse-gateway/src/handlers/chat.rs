//! `/api/chat`: POST runs one user turn, PUT narrates tool results.
//!
//! Both handlers are stateless; the widget sends the full conversation every time. Validation
//! errors are 400s and never reach the model. A failed user turn is a 500 carrying the apology,
//! a failed narration is still a 200 so the widget can acknowledge the actions that did run.

use crate::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cobrowse_core::{ChatError, ChatRequest, ToolResultsRequest, APOLOGY};
use serde_json::json;

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.into() }))).into_response()
}

/// POST /api/chat
pub(crate) async fn chat_message(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4();
    // Unparseable bodies are reported like a missing message.
    let value = serde_json::from_slice::<serde_json::Value>(&body).unwrap_or(serde_json::Value::Null);
    let request = match ChatRequest::from_json(value) {
        Ok(req) => req,
        Err(e) => {
            tracing::info!(target: "cobrowse::gateway", %request_id, reason = %e, "chat request rejected");
            return bad_request(e.to_string());
        }
    };
    tracing::info!(
        target: "cobrowse::gateway",
        %request_id,
        message_len = request.message.len(),
        history_len = request.conversation_history.len(),
        section = request.section_id.as_deref().unwrap_or(""),
        "chat request received"
    );

    match state.chat.chat(&request).await {
        Ok(response) => {
            tracing::info!(
                target: "cobrowse::gateway",
                %request_id,
                requires_action = response.requires_action,
                tool_calls = response.tool_calls.len(),
                "chat response ready"
            );
            Json(response).into_response()
        }
        Err(ChatError::Validation(msg)) => bad_request(msg),
        Err(e) => {
            tracing::error!(target: "cobrowse::gateway", %request_id, error = %e, "chat request failed");
            let mut body = json!({
                "message": APOLOGY,
                "toolCalls": [],
                "requiresAction": false,
            });
            if state.config.is_development() {
                body["error"] = json!(e.to_string());
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// PUT /api/chat
pub(crate) async fn tool_results(State(state): State<AppState>, body: Bytes) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let value = serde_json::from_slice::<serde_json::Value>(&body).unwrap_or(serde_json::Value::Null);
    let request = match ToolResultsRequest::from_json(value) {
        Ok(req) => req,
        Err(e) => {
            tracing::info!(target: "cobrowse::gateway", %request_id, reason = %e, "tool results rejected");
            return bad_request(e.to_string());
        }
    };
    tracing::info!(
        target: "cobrowse::gateway",
        %request_id,
        count = request.tool_results.len(),
        all_succeeded = request.all_succeeded(),
        "tool results received"
    );
    Json(state.chat.follow_up(&request).await).into_response()
}
