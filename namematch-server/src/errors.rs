use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use namematch_collab::{DatabaseError, DirectoryError, MatchError, SeedError, SessionError, VoteError};
use thiserror::Error;

pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{resource}:{identifier} not found")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        resource: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("User already has an active session")]
    AlreadyInSession,
    #[error("Session not found")]
    SessionNotFound,
    #[error("Users cannot join their own session")]
    SelfJoin,
    #[error("Session already has a partner")]
    AlreadyPartnered,
    #[error("User must have an active session")]
    NoActiveSession,
    #[error("Name not found")]
    NameNotFound,
    #[error("No vote exists for this name")]
    VoteNotFound,
    #[error("Only a dislike can be cleared")]
    NotADislike,
    #[error("Unknown internal error: {0}")]
    Unknown(String),
}

impl ServerError {
    fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::AlreadyInSession => StatusCode::CONFLICT,
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::SelfJoin => StatusCode::BAD_REQUEST,
            Self::AlreadyPartnered => StatusCode::CONFLICT,
            Self::NoActiveSession => StatusCode::BAD_REQUEST,
            Self::NameNotFound => StatusCode::NOT_FOUND,
            Self::VoteNotFound => StatusCode::NOT_FOUND,
            Self::NotADislike => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.as_status_code(), self.to_string()).into_response()
    }
}

impl From<DatabaseError> for ServerError {
    fn from(value: DatabaseError) -> Self {
        match value {
            DatabaseError::NotFound {
                resource,
                identifier,
            } => Self::NotFound {
                resource,
                identifier,
            },
            DatabaseError::Conflict {
                resource,
                field,
                value,
            } => Self::Conflict {
                resource,
                field,
                value,
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(value: SessionError) -> Self {
        match value {
            SessionError::AlreadyInSession => Self::AlreadyInSession,
            SessionError::NotFound => Self::SessionNotFound,
            SessionError::SelfJoin => Self::SelfJoin,
            SessionError::AlreadyPartnered => Self::AlreadyPartnered,
            SessionError::Db(e) => e.into(),
        }
    }
}

impl From<VoteError> for ServerError {
    fn from(value: VoteError) -> Self {
        match value {
            VoteError::NoActiveSession => Self::NoActiveSession,
            VoteError::NameNotFound => Self::NameNotFound,
            VoteError::Db(e) => e.into(),
        }
    }
}

impl From<MatchError> for ServerError {
    fn from(value: MatchError) -> Self {
        match value {
            MatchError::NoActiveSession => Self::NoActiveSession,
            MatchError::VoteNotFound => Self::VoteNotFound,
            MatchError::NotADislike => Self::NotADislike,
            MatchError::Db(e) => e.into(),
        }
    }
}

impl From<DirectoryError> for ServerError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::UserNotFound(_) => Self::NotFound {
                resource: "user",
                identifier: "id",
            },
            e => Self::Unknown(e.to_string()),
        }
    }
}

impl From<SeedError> for ServerError {
    fn from(value: SeedError) -> Self {
        Self::Unknown(value.to_string())
    }
}
