use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode},
    Json,
};
use namematch_collab::{PrimaryKey, UserRecord};

use crate::{
    serialized::{ToSerialized, User},
    ServerContext,
};

/// The authenticated account behind a request, resolved from the bearer
/// token through the external user directory
pub struct Identity(UserRecord);

impl Identity {
    pub fn user(&self) -> UserRecord {
        self.0.clone()
    }

    pub fn user_id(&self) -> PrimaryKey {
        self.0.id
    }
}

#[async_trait]
impl FromRequestParts<ServerContext> for Identity {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerContext,
    ) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization"))?;

        let parts: Vec<_> = token.split_ascii_whitespace().collect();

        if parts.first() != Some(&"Bearer") {
            return Err((StatusCode::BAD_REQUEST, "Authorization must be Bearer"));
        }

        let token = parts.last().cloned().unwrap_or_default();

        let user = context
            .app
            .directory()
            .user_by_token(token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Token does not resolve to a user"))?;

        Ok(Self(user))
    }
}

#[utoipa::path(
    get,
    path = "/v1/auth/user",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User)
    )
)]
async fn user(identity: Identity) -> Json<User> {
    Json(identity.user().to_serialized())
}

pub fn router() -> crate::Router {
    crate::Router::new().route("/user", axum::routing::get(user))
}
