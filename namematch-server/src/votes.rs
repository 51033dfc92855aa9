use axum::{
    extract::State,
    routing::{get, post},
    Json,
};

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::ServerResult,
    schemas::{NewVoteSchema, ValidatedJson},
    serialized::{ToSerialized, Vote, VoteOutcome, VoteStats},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/votes",
    tag = "votes",
    request_body = NewVoteSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = VoteOutcome)
    )
)]
async fn submit_vote(
    identity: Identity,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewVoteSchema>,
) -> ServerResult<Json<VoteOutcome>> {
    let result = context
        .app
        .votes
        .submit_vote(identity.user_id(), body.name_id, body.vote_type)
        .await?;

    Ok(Json(result.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/votes",
    tag = "votes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Vote>)
    )
)]
async fn list_votes(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Vote>>> {
    let votes = context.app.votes.user_votes(identity.user_id()).await?;

    Ok(Json(votes.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/votes/stats",
    tag = "votes",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = VoteStats)
    )
)]
async fn vote_stats(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<VoteStats>> {
    let stats = context.app.votes.vote_stats(identity.user_id()).await?;

    Ok(Json(stats.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(submit_vote))
        .route("/", get(list_votes))
        .route("/stats", get(vote_stats))
}
