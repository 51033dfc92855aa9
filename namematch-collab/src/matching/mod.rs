use chrono::{DateTime, Utc};
use log::info;
use thiserror::Error;

use crate::{
    AppContext, Database, DatabaseError, NameData, PrimaryKey, SessionData, VoteData, VoteType,
};

/// Derives matches and conflicts from the two participants' votes.
///
/// Both are views computed by joining the vote set at read time, nothing is
/// materialized. That keeps a single source of truth at the cost of an
/// O(votes) read, which is fine for session-scoped vote counts.
pub struct MatchResolver<Db> {
    context: AppContext<Db>,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("User must have an active session")]
    NoActiveSession,
    #[error("No vote exists for this name")]
    VoteNotFound,
    #[error("Can only clear a dislike")]
    NotADislike,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

/// A name both participants liked
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub name: NameData,
    /// The later of the two like timestamps
    pub matched_at: DateTime<Utc>,
}

/// A name the two participants voted oppositely on
#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub name: NameData,
    /// True when the requesting user liked it and the partner disliked it
    pub i_liked_it: bool,
    /// The timestamp of whichever vote created the disagreement
    pub conflicted_at: DateTime<Utc>,
}

/// Pairs of likes shared by both vote sets, as (name id, later timestamp)
pub(crate) fn liked_pairs(
    user_votes: &[VoteData],
    partner_votes: &[VoteData],
) -> Vec<(PrimaryKey, DateTime<Utc>)> {
    user_votes
        .iter()
        .filter(|v| v.vote_type == VoteType::Like)
        .filter_map(|user_vote| {
            partner_votes
                .iter()
                .find(|p| p.name_id == user_vote.name_id && p.vote_type == VoteType::Like)
                .map(|partner_vote| {
                    (
                        user_vote.name_id,
                        user_vote.voted_at.max(partner_vote.voted_at),
                    )
                })
        })
        .collect()
}

/// Names the two sets disagree on, as (name id, user liked it, later
/// timestamp). Mutual likes and mutual dislikes are excluded.
pub(crate) fn opposed_pairs(
    user_votes: &[VoteData],
    partner_votes: &[VoteData],
) -> Vec<(PrimaryKey, bool, DateTime<Utc>)> {
    user_votes
        .iter()
        .filter_map(|user_vote| {
            partner_votes
                .iter()
                .find(|p| p.name_id == user_vote.name_id && p.vote_type != user_vote.vote_type)
                .map(|partner_vote| {
                    (
                        user_vote.name_id,
                        user_vote.vote_type == VoteType::Like,
                        user_vote.voted_at.max(partner_vote.voted_at),
                    )
                })
        })
        .collect()
}

impl<Db> MatchResolver<Db>
where
    Db: Database,
{
    pub fn new(context: &AppContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Names both participants liked, most recent match first.
    ///
    /// Empty when the user has no non-completed session or no partner has
    /// joined yet. Two likes that committed near-simultaneously without
    /// either submitter seeing a match flag reconcile here on the next
    /// poll.
    pub async fn matches(&self, user_id: PrimaryKey) -> Result<Vec<MatchRecord>, DatabaseError> {
        let pairs = match self.paired_votes(user_id).await? {
            Some((user_votes, partner_votes)) => liked_pairs(&user_votes, &partner_votes),
            None => return Ok(Vec::new()),
        };

        let mut matches = Vec::with_capacity(pairs.len());

        for (name_id, matched_at) in pairs {
            let name = self.context.database.name_by_id(name_id).await?;
            matches.push(MatchRecord { name, matched_at });
        }

        matches.sort_by(|a, b| b.matched_at.cmp(&a.matched_at));
        Ok(matches)
    }

    pub async fn match_count(&self, user_id: PrimaryKey) -> Result<i64, DatabaseError> {
        let count = match self.paired_votes(user_id).await? {
            Some((user_votes, partner_votes)) => liked_pairs(&user_votes, &partner_votes).len(),
            None => 0,
        };

        Ok(count as i64)
    }

    /// Names the participants disagree on, most recent disagreement first
    pub async fn conflicts(&self, user_id: PrimaryKey) -> Result<Vec<ConflictRecord>, DatabaseError> {
        let pairs = match self.paired_votes(user_id).await? {
            Some((user_votes, partner_votes)) => opposed_pairs(&user_votes, &partner_votes),
            None => return Ok(Vec::new()),
        };

        let mut conflicts = Vec::with_capacity(pairs.len());

        for (name_id, i_liked_it, conflicted_at) in pairs {
            let name = self.context.database.name_by_id(name_id).await?;

            conflicts.push(ConflictRecord {
                name,
                i_liked_it,
                conflicted_at,
            });
        }

        conflicts.sort_by(|a, b| b.conflicted_at.cmp(&a.conflicted_at));
        Ok(conflicts)
    }

    /// Deletes the user's dislike on a name, returning it to their voting
    /// pool. A hard delete, so any conflict derived from the vote
    /// disappears with it.
    pub async fn clear_dislike(
        &self,
        user_id: PrimaryKey,
        name_id: PrimaryKey,
    ) -> Result<bool, MatchError> {
        let session = self
            .context
            .database
            .active_session_for_user(user_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => MatchError::NoActiveSession,
                e => MatchError::Db(e),
            })?;

        let vote = self
            .context
            .database
            .vote_for_name(session.id, user_id, name_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => MatchError::VoteNotFound,
                e => MatchError::Db(e),
            })?;

        if vote.vote_type == VoteType::Like {
            return Err(MatchError::NotADislike);
        }

        self.context
            .database
            .delete_vote(vote.id)
            .await
            .map_err(MatchError::Db)?;

        info!(
            "User {} cleared their dislike on name {} in session {}",
            user_id, name_id, session.id
        );

        Ok(true)
    }

    /// Both participants' votes for the user's current session, or none
    /// when there is no session or no partner yet
    async fn paired_votes(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Option<(Vec<VoteData>, Vec<VoteData>)>, DatabaseError> {
        let session: SessionData = match self.context.database.session_for_user(user_id).await {
            Ok(session) => session,
            Err(DatabaseError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let partner_id = match session.partner_of(user_id) {
            Some(id) => id,
            None => return Ok(None),
        };

        let user_votes = self
            .context
            .database
            .votes_by_user(session.id, user_id)
            .await?;
        let partner_votes = self
            .context
            .database
            .votes_by_user(session.id, partner_id)
            .await?;

        Ok(Some((user_votes, partner_votes)))
    }
}
