use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::maintenance;
use crate::models::shared::ClearAllResponse;
use crate::state::AppState;

#[utoipa::path(
    delete,
    path = "/clear-all",
    tag = "Maintenance",
    operation_id = "clearAll",
    summary = "Delete all data",
    description = "Removes every team, judge, flat collection value and stored image.",
    responses(
        (status = 200, description = "Everything deleted", body = ClearAllResponse),
        (status = 503, description = "Store unavailable (STORE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn clear_all(State(state): State<AppState>) -> Result<Json<ClearAllResponse>, AppError> {
    let summary = maintenance::clear_all(&state.db, &*state.blob_store).await?;
    Ok(Json(ClearAllResponse {
        success: true,
        owners: summary.owners,
        documents: summary.documents,
        images: summary.images,
    }))
}
