use std::fmt;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::imaging::IngestError;
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `FORMAT_ERROR`, `UNSUPPORTED_TYPE`,
    /// `SIZE_ERROR`, `DECODE_ERROR`, `CORRUPTED_IMAGE`, `ENCODE_ERROR`,
    /// `STORE_ERROR`, `NOT_FOUND`, `VALIDATION_ERROR`, `INTERNAL_ERROR`.
    #[schema(example = "UNSUPPORTED_TYPE")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "unsupported image type: image/svg+xml")]
    pub message: String,
    /// Always `false`; lets legacy clients branch on the same field as success.
    #[schema(example = false)]
    pub success: bool,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    /// A pipeline stage rejected the upload.
    Ingest(IngestError),
    /// Blob store or database unreachable, or an operation on them failed.
    Store(String),
    NotFound(String),
    Validation(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, code, message) = match self {
            AppError::Ingest(err) => {
                let code = match &err {
                    IngestError::Format(_) => "FORMAT_ERROR",
                    IngestError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
                    IngestError::Size { .. } => "SIZE_ERROR",
                    IngestError::Decode { .. } => "DECODE_ERROR",
                    IngestError::Corrupted { .. } => "CORRUPTED_IMAGE",
                    IngestError::Encode { .. } => "ENCODE_ERROR",
                };
                (StatusCode::BAD_REQUEST, code, err.to_string())
            }
            AppError::Store(detail) => {
                tracing::error!("Store error: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_ERROR",
                    format!("Storage unavailable: {detail}"),
                )
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                )
            }
        };
        (
            status,
            ErrorBody {
                code,
                message,
                success: false,
            },
        )
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Ingest(err) => write!(f, "{err}"),
            AppError::Store(detail) => write!(f, "store unavailable: {detail}"),
            AppError::NotFound(msg) | AppError::Validation(msg) => f.write_str(msg),
            AppError::Internal(detail) => write!(f, "internal error: {detail}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Ingest(err)
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Store(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(handle) => {
                AppError::NotFound(format!("Blob {handle} not found"))
            }
            StorageError::InvalidHandle(detail) => AppError::Validation(detail),
            other => AppError::Store(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("image worker failed: {err}"))
    }
}
