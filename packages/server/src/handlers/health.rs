use axum::Json;
use axum::extract::State;
use chrono::Utc;

use crate::database;
use crate::models::shared::HealthResponse;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    operation_id = "health",
    summary = "Service and database status",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if database::is_healthy(&state.db).await {
        "connected"
    } else {
        "disconnected"
    };
    Json(HealthResponse {
        status: "ok",
        database,
        timestamp: Utc::now(),
    })
}
