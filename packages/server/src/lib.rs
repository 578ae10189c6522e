pub mod catalog;
pub mod config;
pub mod database;
pub mod documents;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod maintenance;
pub mod migration;
pub mod models;
pub mod owners;
pub mod routes;
pub mod state;
pub mod upload;

use std::time::Duration;

use axum::Json;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Podium API",
        version = "1.0.0",
        description = "Image ingestion, team and judge records, and flat collections for the \
            Podium contest dashboard"
    ),
    tags(
        (name = "Images", description = "Upload and fetch owner images"),
        (name = "Owners", description = "Teams and judges"),
        (name = "Documents", description = "Flat collections replaced wholesale"),
        (name = "Maintenance", description = "Whole-store operations"),
        (name = "Health", description = "Service status"),
    ),
)]
struct ApiDoc;

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes())
        .split_for_parts();

    let cors = cors_layer(&state.config.server.cors);
    router
        .route("/image/{image_id}", get(handlers::image::fetch_image))
        .route("/api-docs/openapi.json", get(move || async move { Json(api) }))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allow_origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = config
            .allow_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(%origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}
