//! Upload service: pipeline first, then blob store and catalog.

use common::imaging::ingest_data_url;
use tracing::{info, instrument};

use crate::catalog::{self, ImageOwner};
use crate::error::AppError;
use crate::models::image::{UploadRequest, UploadResponse};
use crate::state::AppState;

/// Process and store one data URL.
///
/// Nothing touches the blob store until every pipeline stage has succeeded.
#[instrument(skip(state, request), fields(owner_id = %request.owner_id))]
pub async fn upload_image(
    state: &AppState,
    request: UploadRequest,
) -> Result<UploadResponse, AppError> {
    if request.image_data.trim().is_empty() {
        return Err(AppError::Validation("imageData is required".into()));
    }

    let config = state.config.imaging.clone();
    let payload = request.image_data;
    let outcome = tokio::task::spawn_blocking(move || ingest_data_url(&config, &payload)).await??;

    let owner = ImageOwner {
        id: request.owner_id,
        name: request.owner_name,
    };
    let record = catalog::store_image(&state.db, &*state.blob_store, &outcome, &owner).await?;

    info!(
        image_id = %record.id,
        original = record.original_size,
        stored = record.stored_size,
        "upload complete"
    );
    Ok(record.into())
}
