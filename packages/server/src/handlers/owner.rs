use axum::Json;
use axum::extract::{Path, State};
use serde_json::Value;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::owner::DeleteTeamRequest;
use crate::models::shared::SuccessResponse;
use crate::owners::{self, OwnerKind, SaveSummary};
use crate::state::AppState;

async fn list(state: &AppState, kind: OwnerKind) -> Result<Json<Vec<Value>>, AppError> {
    Ok(Json(owners::list(&state.db, kind).await?))
}

async fn save(
    state: &AppState,
    kind: OwnerKind,
    payload: Value,
) -> Result<Json<SaveSummary>, AppError> {
    let Value::Array(documents) = payload else {
        return Err(AppError::Validation(format!(
            "Invalid data format for {kind}s, expected a list"
        )));
    };
    Ok(Json(
        owners::save_upsert(&state.db, &*state.blob_store, kind, documents).await?,
    ))
}

async fn remove(
    state: &AppState,
    kind: OwnerKind,
    owner_id: &str,
) -> Result<Json<SuccessResponse>, AppError> {
    owners::delete(&state.db, &*state.blob_store, kind, owner_id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/data/teams",
    tag = "Owners",
    operation_id = "listTeams",
    summary = "List teams",
    description = "Every team with a resolvable `imagePath`: the catalog image when set, \
        otherwise a legacy path or the default team image.",
    responses(
        (status = 200, description = "Team documents", body = Vec<Object>),
        (status = 503, description = "Database unavailable (STORE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_teams(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    list(&state, OwnerKind::Team).await
}

#[utoipa::path(
    post,
    path = "/data/teams",
    tag = "Owners",
    operation_id = "saveTeams",
    summary = "Upsert teams",
    description = "Updates or inserts each team by `team_id`. Teams missing from the list are \
        kept. Entries without `team_id` or `name` are skipped.",
    request_body = Vec<Object>,
    responses(
        (status = 200, description = "Save summary", body = SaveSummary),
        (status = 400, description = "Body is not a list (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "Database unavailable (STORE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn save_teams(
    State(state): State<AppState>,
    AppJson(payload): AppJson<Value>,
) -> Result<Json<SaveSummary>, AppError> {
    save(&state, OwnerKind::Team, payload).await
}

#[utoipa::path(
    delete,
    path = "/data/teams/{team_id}",
    tag = "Owners",
    operation_id = "deleteTeam",
    summary = "Delete a team and its image",
    params(("team_id" = String, Path, description = "Team ID")),
    responses(
        (status = 200, description = "Team deleted", body = SuccessResponse),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_team(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    remove(&state, OwnerKind::Team, &team_id).await
}

#[utoipa::path(
    post,
    path = "/data/teams/delete",
    tag = "Owners",
    operation_id = "deleteTeamLegacy",
    summary = "Delete a team (body form)",
    description = "Same as `DELETE /api/data/teams/{team_id}`, for clients that can only POST.",
    request_body = DeleteTeamRequest,
    responses(
        (status = 200, description = "Team deleted", body = SuccessResponse),
        (status = 400, description = "Missing team_id (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Team not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(team_id = %payload.team_id))]
pub async fn delete_team_by_body(
    State(state): State<AppState>,
    AppJson(payload): AppJson<DeleteTeamRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if payload.team_id.trim().is_empty() {
        return Err(AppError::Validation("Missing team_id".into()));
    }
    remove(&state, OwnerKind::Team, &payload.team_id).await
}

#[utoipa::path(
    get,
    path = "/data/judges",
    tag = "Owners",
    operation_id = "listJudges",
    summary = "List judges",
    responses(
        (status = 200, description = "Judge documents", body = Vec<Object>),
        (status = 503, description = "Database unavailable (STORE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_judges(State(state): State<AppState>) -> Result<Json<Vec<Value>>, AppError> {
    list(&state, OwnerKind::Judge).await
}

#[utoipa::path(
    post,
    path = "/data/judges",
    tag = "Owners",
    operation_id = "saveJudges",
    summary = "Upsert judges",
    description = "Updates or inserts each judge by `id`. Judges missing from the list are kept.",
    request_body = Vec<Object>,
    responses(
        (status = 200, description = "Save summary", body = SaveSummary),
        (status = 400, description = "Body is not a list (VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "Database unavailable (STORE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload))]
pub async fn save_judges(
    State(state): State<AppState>,
    AppJson(payload): AppJson<Value>,
) -> Result<Json<SaveSummary>, AppError> {
    save(&state, OwnerKind::Judge, payload).await
}

#[utoipa::path(
    delete,
    path = "/data/judges/{judge_id}",
    tag = "Owners",
    operation_id = "deleteJudge",
    summary = "Delete a judge and its image",
    params(("judge_id" = String, Path, description = "Judge ID")),
    responses(
        (status = 200, description = "Judge deleted", body = SuccessResponse),
        (status = 404, description = "Judge not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_judge(
    State(state): State<AppState>,
    Path(judge_id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    remove(&state, OwnerKind::Judge, &judge_id).await
}
