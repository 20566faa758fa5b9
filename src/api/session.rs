use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::session::SessionInfo;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SessionDetails {
    pub session_id: String,
    #[serde(flatten)]
    pub info: SessionInfo,
}

#[derive(Debug, Serialize)]
pub struct SessionCleared {
    pub session_id: String,
    pub status: String,
}

/// GET /session/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SessionDetails> {
    let info = state.sessions.info(&id);
    Json(SessionDetails {
        session_id: id,
        info,
    })
}

/// DELETE /session/{id} - forget turns and documents. Unknown ids are not an error.
pub async fn clear_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SessionCleared> {
    if state.sessions.clear(&id) {
        tracing::info!("Cleared session {id}");
    }
    Json(SessionCleared {
        session_id: id,
        status: "cleared".to_string(),
    })
}
