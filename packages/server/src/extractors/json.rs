use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// JSON body extractor whose rejections come back as `VALIDATION_ERROR`
/// bodies instead of axum's plain-text responses.
///
/// Owner and document saves take `AppJson<serde_json::Value>`, so only
/// syntax, content-type and body-size problems are rejected here.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                debug!(status = %rejection.status(), "rejected request body");
                let message = match rejection {
                    JsonRejection::MissingJsonContentType(_) => {
                        "Expected a request with Content-Type: application/json".to_string()
                    }
                    other => other.body_text(),
                };
                Err(AppError::Validation(message))
            }
        }
    }
}
