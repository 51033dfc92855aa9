use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
}

impl DatabaseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Represents a type that can fetch and store namematch data.
///
/// The unique constraints on `join_code`, `partner_link`, and
/// `(user_id, name_id, session_id)` are the actual correctness backstop here.
/// Callers perform best-effort check-then-act sequences on top of them.
#[async_trait]
pub trait Database: Send + Sync + 'static {
    /// Inserts a batch of catalog names, returning the stored rows
    async fn insert_names(&self, new_names: Vec<NewName>) -> Result<Vec<NameData>>;
    async fn name_by_id(&self, name_id: PrimaryKey) -> Result<NameData>;
    /// Total size of the catalog, ignoring any filter
    async fn count_names(&self) -> Result<i64>;
    /// Count of catalog names qualifying under a target gender filter
    async fn count_candidate_names(&self, target: Gender) -> Result<i64>;
    /// Count of qualifying names the user hasn't voted on in this session
    async fn count_unvoted_names(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        target: Gender,
    ) -> Result<i64>;
    /// The unvoted qualifying name at `offset` into the
    /// descending-popularity ordering
    async fn unvoted_name_at(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        target: Gender,
        offset: i64,
    ) -> Result<NameData>;

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn session_by_id(&self, session_id: SessionId) -> Result<SessionData>;
    async fn session_by_join_code(&self, join_code: &str) -> Result<SessionData>;
    async fn session_by_partner_link(&self, partner_link: &str) -> Result<SessionData>;
    /// The user's non-completed session, as initiator or partner
    async fn session_for_user(&self, user_id: PrimaryKey) -> Result<SessionData>;
    /// The user's active session, as initiator or partner
    async fn active_session_for_user(&self, user_id: PrimaryKey) -> Result<SessionData>;
    /// Sets the partner and linked time, transitioning the session to active
    async fn attach_partner(
        &self,
        session_id: SessionId,
        partner_id: PrimaryKey,
        linked_at: DateTime<Utc>,
    ) -> Result<SessionData>;

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData>;
    /// The user's live vote for a name in a session, if any
    async fn vote_for_name(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        name_id: PrimaryKey,
    ) -> Result<VoteData>;
    /// Overwrites the vote type and time of an existing vote in place
    async fn update_vote(
        &self,
        vote_id: PrimaryKey,
        vote_type: VoteType,
        voted_at: DateTime<Utc>,
    ) -> Result<VoteData>;
    async fn delete_vote(&self, vote_id: PrimaryKey) -> Result<()>;
    /// All of a user's votes in a session, newest first
    async fn votes_by_user(&self, session_id: SessionId, user_id: PrimaryKey)
        -> Result<Vec<VoteData>>;
}
