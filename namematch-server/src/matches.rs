use axum::{extract::State, routing::get, Json};

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    serialized::{Match, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/matches",
    tag = "matches",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Match>)
    )
)]
async fn list_matches(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Match>>> {
    let matches = context.app.matching.matches(identity.user_id()).await?;

    Ok(Json(matches.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/matches/count",
    tag = "matches",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = i64)
    )
)]
async fn match_count(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<i64>> {
    let count = context.app.matching.match_count(identity.user_id()).await?;

    Ok(Json(count))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_matches))
        .route("/count", get(match_count))
}
