use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json,
};
use namematch_collab::PrimaryKey;

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    serialized::{Conflict, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/conflicts",
    tag = "conflicts",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Conflict>)
    )
)]
async fn list_conflicts(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Conflict>>> {
    let conflicts = context.app.matching.conflicts(identity.user_id()).await?;

    Ok(Json(conflicts.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/conflicts/{nameId}",
    tag = "conflicts",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The dislike was removed and the name returns to the voting pool")
    )
)]
async fn clear_dislike(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(name_id): Path<PrimaryKey>,
) -> ServerResult<()> {
    context
        .app
        .matching
        .clear_dislike(identity.user_id(), name_id)
        .await?;

    Ok(())
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_conflicts))
        .route("/:name_id", delete(clear_dislike))
}
