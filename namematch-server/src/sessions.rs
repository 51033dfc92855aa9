use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json,
};
use namematch_collab::SessionId;

use crate::{
    auth::Identity,
    context::ServerContext,
    errors::{ServerError, ServerResult},
    schemas::{JoinSessionSchema, NewSessionSchema, ValidatedJson},
    serialized::{Session, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/sessions",
    tag = "sessions",
    request_body = NewSessionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Session)
    )
)]
async fn create_session(
    identity: Identity,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewSessionSchema>,
) -> ServerResult<Json<Session>> {
    let session = context
        .app
        .sessions
        .create_session(identity.user_id(), body.target_gender)
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/current",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Option<Session>)
    )
)]
async fn current_session(
    identity: Identity,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Option<Session>>> {
    let session = context
        .app
        .sessions
        .current_session(identity.user_id())
        .await?;

    Ok(Json(session.map(|s| s.to_serialized())))
}

#[utoipa::path(
    get,
    path = "/v1/sessions/{id}",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Session)
    )
)]
async fn session_by_id(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(session_id): Path<SessionId>,
) -> ServerResult<Json<Session>> {
    let session = context
        .app
        .sessions
        .session_by_id(session_id, identity.user_id())
        .await?
        .ok_or(ServerError::SessionNotFound)?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/members",
    tag = "sessions",
    request_body = JoinSessionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Session)
    )
)]
async fn join_by_code(
    identity: Identity,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<JoinSessionSchema>,
) -> ServerResult<Json<Session>> {
    let session = context
        .app
        .sessions
        .join_by_code(identity.user_id(), &body.join_code)
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/sessions/links/{token}/members",
    tag = "sessions",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Session)
    )
)]
async fn join_by_link(
    identity: Identity,
    State(context): State<ServerContext>,
    Path(token): Path<String>,
) -> ServerResult<Json<Session>> {
    let session = context
        .app
        .sessions
        .join_by_link(identity.user_id(), &token)
        .await?;

    Ok(Json(session.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/current", get(current_session))
        .route("/members", post(join_by_code))
        .route("/links/:token/members", post(join_by_link))
        .route("/:id", get(session_by_id))
}
