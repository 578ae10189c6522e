use serde::Deserialize;

/// Body of the legacy `POST /api/data/teams/delete`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DeleteTeamRequest {
    #[schema(example = "team-1")]
    pub team_id: String,
}
