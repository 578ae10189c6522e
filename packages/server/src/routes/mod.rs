use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

/// Everything served under `/api`.
pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(image_routes())
        .merge(data_routes())
        .routes(routes!(handlers::maintenance::clear_all))
        .routes(routes!(handlers::health::health))
}

fn image_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::image::upload_image))
        .layer(handlers::image::upload_body_limit())
        .routes(routes!(handlers::image::fetch_image))
}

fn data_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::owner::list_teams,
            handlers::owner::save_teams
        ))
        .routes(routes!(handlers::owner::delete_team))
        .routes(routes!(handlers::owner::delete_team_by_body))
        .routes(routes!(
            handlers::owner::list_judges,
            handlers::owner::save_judges
        ))
        .routes(routes!(handlers::owner::delete_judge))
        .routes(routes!(
            handlers::document::get_collection,
            handlers::document::save_collection
        ))
}
