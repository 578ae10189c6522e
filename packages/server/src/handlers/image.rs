use axum::Json;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use tracing::instrument;
use uuid::Uuid;

use crate::catalog;
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::image::{UploadRequest, UploadResponse};
use crate::state::AppState;
use crate::upload;

/// Base64 inflates the 100 MiB decoded ceiling by a third; leave headroom.
pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(150 * 1024 * 1024) // 150 MB
}

#[utoipa::path(
    post,
    path = "/upload-image",
    tag = "Images",
    operation_id = "uploadImage",
    summary = "Upload an owner image",
    description = "Accepts a base64 data URL, repairs and validates it, re-encodes it as PNG \
        (transparent or PNG sources) or progressive JPEG, and records it in the catalog. \
        Nothing is stored when any stage fails.",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Rejected by the pipeline (FORMAT_ERROR, UNSUPPORTED_TYPE, \
            SIZE_ERROR, DECODE_ERROR, CORRUPTED_IMAGE, ENCODE_ERROR, VALIDATION_ERROR)", body = ErrorBody),
        (status = 503, description = "Blob store or database unavailable (STORE_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(owner_id = %payload.owner_id))]
pub async fn upload_image(
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    Ok(Json(upload::upload_image(&state, payload).await?))
}

#[utoipa::path(
    get,
    path = "/image/{image_id}",
    tag = "Images",
    operation_id = "fetchImage",
    summary = "Fetch a stored image",
    description = "Returns the stored bytes. Supports ETag-based caching via If-None-Match. \
        Also served at `/image/{image_id}` outside the API prefix.",
    params(("image_id" = String, Path, description = "Image ID (UUID)")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn fetch_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let not_found = || AppError::NotFound(format!("Image {image_id} not found"));
    let id = Uuid::parse_str(&image_id).map_err(|_| not_found())?;

    let record = catalog::lookup(&state.db, id).await?.ok_or_else(not_found)?;
    let etag_value = format!("\"{}\"", record.content_hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let fetched = catalog::fetch(&state.db, &*state.blob_store, id).await?;
    let record = fetched.record;
    let owner = HeaderValue::from_bytes(record.owner_name.as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static(""));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, &record.mime_type)
        .header(header::CONTENT_LENGTH, fetched.bytes.len().to_string())
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "public, max-age=86400")
        .header("X-Image-Dimensions", format!("{}x{}", record.width, record.height))
        .header("X-Image-Owner", owner)
        .body(Body::from(fetched.bytes))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}
