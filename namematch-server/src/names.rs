use axum::{
    extract::{Path, State},
    routing::get,
    Json,
};
use namematch_collab::SessionId;

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    serialized::{Name, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/names/next",
    tag = "names",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Option<Name>, description = "The next name to vote on, or null when the pool is exhausted")
    )
)]
async fn next_name(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Option<Name>>> {
    let name = context
        .app
        .names
        .next_unvoted_name(identity.user_id())
        .await?;

    Ok(Json(name.map(|n| n.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/v1/names/{sessionId}/count",
    tag = "names",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = i64, description = "How many catalog names qualify for the session")
    )
)]
async fn name_count(
    _identity: Identity,
    State(context): State<ServerContext>,
    Path(session_id): Path<SessionId>,
) -> ServerResult<Json<i64>> {
    let count = context.app.names.name_count_for_session(session_id).await?;

    Ok(Json(count))
}

pub fn router() -> Router {
    Router::new()
        .route("/next", get(next_name))
        .route("/:session_id/count", get(name_count))
}
