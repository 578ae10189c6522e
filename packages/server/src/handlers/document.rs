use axum::Json;
use axum::extract::{Path, State};
use serde_json::Value;
use tracing::instrument;

use crate::documents;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::shared::SuccessResponse;
use crate::state::AppState;

fn known_collection(collection: &str) -> Result<(), AppError> {
    if documents::is_collection(collection) {
        Ok(())
    } else {
        Err(AppError::NotFound(format!("Data type {collection} not found")))
    }
}

#[utoipa::path(
    get,
    path = "/data/{collection}",
    tag = "Documents",
    operation_id = "listDocuments",
    summary = "Read a flat collection",
    params(("collection" = String, Path, description = "questions, used_judges, used_questions or used_final_questions")),
    responses(
        (status = 200, description = "Collection values in saved order", body = Vec<Object>),
        (status = 404, description = "Unknown collection (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
) -> Result<Json<Vec<Value>>, AppError> {
    known_collection(&collection)?;
    Ok(Json(documents::list(&state.db, &collection).await?))
}

#[utoipa::path(
    post,
    path = "/data/{collection}",
    tag = "Documents",
    operation_id = "replaceDocuments",
    summary = "Replace a flat collection",
    description = "Deletes every stored value of the collection and saves the posted list in order.",
    params(("collection" = String, Path, description = "questions, used_judges, used_questions or used_final_questions")),
    request_body = Vec<Object>,
    responses(
        (status = 200, description = "Collection replaced", body = SuccessResponse),
        (status = 404, description = "Unknown collection (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn save_collection(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    AppJson(payload): AppJson<Value>,
) -> Result<Json<SuccessResponse>, AppError> {
    known_collection(&collection)?;
    documents::replace_all(&state.db, &collection, payload).await?;
    Ok(Json(SuccessResponse::ok()))
}
