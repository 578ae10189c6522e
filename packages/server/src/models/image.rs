use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::image_record;
use crate::owners::image_path;

/// Body of `POST /api/upload-image`.
///
/// The owner fields also accept the `teamId`/`teamName` names older clients send.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// `data:<mime>;base64,<payload>`.
    #[schema(example = "data:image/png;base64,iVBORw0KGgo...")]
    pub image_data: String,
    #[serde(default, alias = "teamName")]
    #[schema(example = "Red Team")]
    pub owner_name: String,
    #[serde(default, alias = "teamId")]
    #[schema(example = "team-1")]
    pub owner_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub image_id: Uuid,
    /// Where the stored image can be fetched.
    #[serde(rename = "imagePath")]
    #[schema(example = "/image/6f1c2a8e-3f4b-4c1d-9e2a-1b2c3d4e5f60")]
    pub image_path: String,
    /// Decoded size of the uploaded payload, in bytes.
    pub original_size: i64,
    /// Size after re-encoding, in bytes.
    pub optimized_size: i64,
    pub dimensions: Dimensions,
}

impl From<image_record::Model> for UploadResponse {
    fn from(record: image_record::Model) -> Self {
        Self {
            success: true,
            image_id: record.id,
            image_path: image_path(record.id),
            original_size: record.original_size,
            optimized_size: record.stored_size,
            dimensions: Dimensions {
                width: record.width as u32,
                height: record.height as u32,
            },
        }
    }
}
