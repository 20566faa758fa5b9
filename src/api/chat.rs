use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::agents::chat::process_message;
use crate::models::{ChatRequest, ChatResponse, MAX_CHAT_MESSAGE_LEN};
use crate::state::AppState;

/// POST /chat - answer a message with document, place and web context.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Message is required".to_string()));
    }
    if message.chars().count() > MAX_CHAT_MESSAGE_LEN {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Message must be at most {MAX_CHAT_MESSAGE_LEN} characters"),
        ));
    }

    let response = process_message(&state, message, req.session_id.as_deref())
        .await
        .map_err(|e| {
            tracing::error!("Chat failed: {e:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Chat error: {e}"),
            )
        })?;

    Ok(Json(response))
}
