use chrono::{DateTime, Utc};
use serde::Serialize;

/// Acknowledgement returned by write endpoints.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SuccessResponse {
    #[schema(example = true)]
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: &'static str,
    /// `connected` or `disconnected`.
    #[schema(example = "connected")]
    pub database: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Result of `DELETE /api/clear-all`: rows removed per table.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ClearAllResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = 12)]
    pub owners: u64,
    pub documents: u64,
    pub images: u64,
}
