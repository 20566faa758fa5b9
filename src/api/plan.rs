use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::agents::planner::plan_trip;
use crate::models::{TripPlanRequest, TripPlanResponse};
use crate::state::AppState;

/// POST /plan - build an itinerary for a destination, duration and budget.
pub async fn plan(
    State(state): State<AppState>,
    Json(req): Json<TripPlanRequest>,
) -> Result<Json<TripPlanResponse>, (StatusCode, String)> {
    req.validate()
        .map_err(|msg| (StatusCode::BAD_REQUEST, msg))?;

    tracing::info!(
        "Planning {}-day trip to {} ({:.2} {})",
        req.duration_days,
        req.destination,
        req.budget,
        req.currency
    );

    let response = plan_trip(&state.llm, &req).await.map_err(|e| {
        tracing::error!("Planning failed: {e:#}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Planning error: {e}"),
        )
    })?;

    Ok(Json(response))
}
