use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::observability::{ActiveTraces, MetricsSnapshot, MetricsSummary};
use crate::state::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub llm_provider: String,
    pub llm_connected: bool,
}

/// GET / - service banner and endpoint listing
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Travel Concierge API",
        "version": VERSION,
        "status": "running",
        "llm": state.llm.provider_name(),
        "endpoints": {
            "health": "GET /health",
            "metrics": "GET /metrics",
            "metrics_summary": "GET /metrics/summary",
            "traces": "GET /traces",
            "chat": "POST /chat",
            "plan": "POST /plan",
            "upload": "POST /upload",
            "session_info": "GET /session/{session_id}",
            "clear_session": "DELETE /session/{session_id}"
        }
    }))
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.llm.is_healthy().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        llm_provider: state.llm.provider_name().to_string(),
        llm_connected: connected,
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// GET /metrics/summary
pub async fn metrics_summary(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.metrics.summary())
}

/// GET /traces
pub async fn traces(State(state): State<AppState>) -> Json<ActiveTraces> {
    Json(state.tracer.active())
}
