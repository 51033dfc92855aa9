use chrono::Utc;
use log::info;
use thiserror::Error;

use crate::{
    matching::liked_pairs, AppContext, Database, DatabaseError, MatchRecord, NameData, NewVote,
    PrimaryKey, VoteData, VoteType,
};

/// Records and reads the per-user votes of a session
pub struct VoteLedger<Db> {
    context: AppContext<Db>,
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("User must have an active session to vote")]
    NoActiveSession,
    #[error("Name not found")]
    NameNotFound,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

/// The outcome of submitting a vote
#[derive(Debug)]
pub struct VoteResult {
    pub vote_id: PrimaryKey,
    /// True when this vote was a like and the partner already liked the
    /// same name
    pub is_match: bool,
    pub matched: Option<MatchRecord>,
}

/// A vote joined with the name it was cast on
#[derive(Debug, Clone)]
pub struct VoteView {
    pub vote: VoteData,
    pub name: NameData,
}

/// Aggregates over a user's votes in their active session
#[derive(Debug, Default, PartialEq, Eq)]
pub struct VoteStats {
    pub total_votes: i64,
    pub like_count: i64,
    pub dislike_count: i64,
    pub match_count: i64,
    /// Qualifying names the user hasn't voted on yet
    pub names_remaining: i64,
}

impl<Db> VoteLedger<Db>
where
    Db: Database,
{
    pub fn new(context: &AppContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Records the user's vote on a name, overwriting any earlier vote for
    /// the same name in place.
    ///
    /// Match detection is best effort: it only sees a partner like that
    /// committed before this write, so two simultaneous likes can both come
    /// back unflagged and reconcile on the next matches poll.
    pub async fn submit_vote(
        &self,
        user_id: PrimaryKey,
        name_id: PrimaryKey,
        vote_type: VoteType,
    ) -> Result<VoteResult, VoteError> {
        let session = self
            .context
            .database
            .active_session_for_user(user_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => VoteError::NoActiveSession,
                e => VoteError::Db(e),
            })?;

        let name = self
            .context
            .database
            .name_by_id(name_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => VoteError::NameNotFound,
                e => VoteError::Db(e),
            })?;

        let now = Utc::now();

        let vote = match self
            .context
            .database
            .vote_for_name(session.id, user_id, name_id)
            .await
        {
            Ok(existing) => self
                .context
                .database
                .update_vote(existing.id, vote_type, now)
                .await
                .map_err(VoteError::Db)?,
            Err(DatabaseError::NotFound { .. }) => self
                .context
                .database
                .create_vote(NewVote {
                    user_id,
                    name_id,
                    session_id: session.id,
                    vote_type,
                    voted_at: now,
                })
                .await
                .map_err(VoteError::Db)?,
            Err(e) => return Err(VoteError::Db(e)),
        };

        let mut result = VoteResult {
            vote_id: vote.id,
            is_match: false,
            matched: None,
        };

        if vote_type == VoteType::Like {
            if let Some(partner_id) = session.partner_of(user_id) {
                let partner_liked = match self
                    .context
                    .database
                    .vote_for_name(session.id, partner_id, name_id)
                    .await
                {
                    Ok(partner_vote) => partner_vote.vote_type == VoteType::Like,
                    Err(DatabaseError::NotFound { .. }) => false,
                    Err(e) => return Err(VoteError::Db(e)),
                };

                if partner_liked {
                    info!(
                        "Users {} and {} matched on \"{}\" in session {}",
                        user_id, partner_id, name.text, session.id
                    );

                    result.is_match = true;
                    result.matched = Some(MatchRecord {
                        name,
                        matched_at: now,
                    });
                }
            }
        }

        Ok(result)
    }

    /// All of the user's votes in their active session, newest first.
    /// Empty when there is no active session.
    pub async fn user_votes(&self, user_id: PrimaryKey) -> Result<Vec<VoteView>, DatabaseError> {
        let session = match self.context.database.active_session_for_user(user_id).await {
            Ok(session) => session,
            Err(DatabaseError::NotFound { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let votes = self
            .context
            .database
            .votes_by_user(session.id, user_id)
            .await?;

        let mut views = Vec::with_capacity(votes.len());

        for vote in votes {
            let name = self.context.database.name_by_id(vote.name_id).await?;
            views.push(VoteView { vote, name });
        }

        Ok(views)
    }

    /// Aggregates the user's voting progress in their active session.
    /// All zeroes when there is no active session.
    pub async fn vote_stats(&self, user_id: PrimaryKey) -> Result<VoteStats, DatabaseError> {
        let session = match self.context.database.active_session_for_user(user_id).await {
            Ok(session) => session,
            Err(DatabaseError::NotFound { .. }) => return Ok(VoteStats::default()),
            Err(e) => return Err(e),
        };

        let votes = self
            .context
            .database
            .votes_by_user(session.id, user_id)
            .await?;

        let like_count = votes
            .iter()
            .filter(|v| v.vote_type == VoteType::Like)
            .count() as i64;

        let match_count = match session.partner_of(user_id) {
            Some(partner_id) => {
                let partner_votes = self
                    .context
                    .database
                    .votes_by_user(session.id, partner_id)
                    .await?;

                liked_pairs(&votes, &partner_votes).len() as i64
            }
            None => 0,
        };

        // The remaining count only applies the gender filter, not the
        // per-user exclusion, so it pairs with total_votes
        let candidate_count = self
            .context
            .database
            .count_candidate_names(session.target_gender)
            .await?;

        let total_votes = votes.len() as i64;

        Ok(VoteStats {
            total_votes,
            like_count,
            dislike_count: total_votes - like_count,
            match_count,
            names_remaining: (candidate_count - total_votes).max(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing, Gender, SessionManager};

    #[tokio::test]
    async fn voting_requires_an_active_session() {
        let context = testing::context();
        let emma = testing::add_name(&context, "Emma", Gender::Female, 90).await;
        let ledger = VoteLedger::new(&context);

        let without_session = ledger.submit_vote(1, emma, VoteType::Like).await;
        assert!(matches!(without_session, Err(VoteError::NoActiveSession)));

        // A session still waiting for a partner doesn't count
        SessionManager::new(&context)
            .create_session(1, Gender::Female)
            .await
            .unwrap();

        let while_waiting = ledger.submit_vote(1, emma, VoteType::Like).await;
        assert!(matches!(while_waiting, Err(VoteError::NoActiveSession)));
    }

    #[tokio::test]
    async fn unknown_names_are_rejected() {
        let context = testing::context();
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let result = VoteLedger::new(&context)
            .submit_vote(1, 9999, VoteType::Like)
            .await;

        assert!(matches!(result, Err(VoteError::NameNotFound)));
    }

    #[tokio::test]
    async fn revoting_overwrites_in_place() {
        let context = testing::context();
        let emma = testing::add_name(&context, "Emma", Gender::Female, 90).await;
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let ledger = VoteLedger::new(&context);

        let first = ledger.submit_vote(1, emma, VoteType::Like).await.unwrap();
        let second = ledger
            .submit_vote(1, emma, VoteType::Dislike)
            .await
            .unwrap();

        assert_eq!(first.vote_id, second.vote_id);

        let votes = ledger.user_votes(1).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].vote.vote_type, VoteType::Dislike);
    }

    #[tokio::test]
    async fn second_like_flags_the_match() {
        let context = testing::context();
        let emma = testing::add_name(&context, "Emma", Gender::Female, 90).await;
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let ledger = VoteLedger::new(&context);

        let first = ledger.submit_vote(1, emma, VoteType::Like).await.unwrap();
        assert!(!first.is_match);
        assert!(first.matched.is_none());

        let second = ledger.submit_vote(2, emma, VoteType::Like).await.unwrap();
        assert!(second.is_match);

        let matched = second.matched.unwrap();
        assert_eq!(matched.name.id, emma);
        assert_eq!(matched.name.text, "Emma");

        // Both sides see it in their stats afterwards
        assert_eq!(ledger.vote_stats(1).await.unwrap().match_count, 1);
        assert_eq!(ledger.vote_stats(2).await.unwrap().match_count, 1);
    }

    #[tokio::test]
    async fn no_match_against_a_partner_dislike() {
        let context = testing::context();
        let emma = testing::add_name(&context, "Emma", Gender::Female, 90).await;
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let ledger = VoteLedger::new(&context);
        ledger
            .submit_vote(2, emma, VoteType::Dislike)
            .await
            .unwrap();

        let result = ledger.submit_vote(1, emma, VoteType::Like).await.unwrap();
        assert!(!result.is_match);
        assert!(result.matched.is_none());
    }

    #[tokio::test]
    async fn dislikes_never_flag_a_match() {
        let context = testing::context();
        let emma = testing::add_name(&context, "Emma", Gender::Female, 90).await;
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let ledger = VoteLedger::new(&context);
        ledger.submit_vote(2, emma, VoteType::Like).await.unwrap();

        let result = ledger
            .submit_vote(1, emma, VoteType::Dislike)
            .await
            .unwrap();

        assert!(!result.is_match);
    }

    #[tokio::test]
    async fn votes_come_back_newest_first() {
        let context = testing::context();
        let emma = testing::add_name(&context, "Emma", Gender::Female, 90).await;
        let olivia = testing::add_name(&context, "Olivia", Gender::Female, 88).await;
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let ledger = VoteLedger::new(&context);
        ledger.submit_vote(1, emma, VoteType::Like).await.unwrap();
        ledger
            .submit_vote(1, olivia, VoteType::Dislike)
            .await
            .unwrap();

        let votes = ledger.user_votes(1).await.unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].name.text, "Olivia");
        assert_eq!(votes[1].name.text, "Emma");
    }

    #[tokio::test]
    async fn stats_track_remaining_candidates() {
        let context = testing::context();

        // Four qualifying names and one that isn't
        let emma = testing::add_name(&context, "Emma", Gender::Female, 90).await;
        let olivia = testing::add_name(&context, "Olivia", Gender::Female, 88).await;
        let mia = testing::add_name(&context, "Mia", Gender::Female, 85).await;
        testing::add_name(&context, "Alex", Gender::Neutral, 80).await;
        testing::add_name(&context, "Liam", Gender::Male, 95).await;

        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let ledger = VoteLedger::new(&context);
        ledger.submit_vote(1, emma, VoteType::Like).await.unwrap();
        ledger.submit_vote(1, olivia, VoteType::Like).await.unwrap();
        ledger.submit_vote(1, mia, VoteType::Dislike).await.unwrap();
        ledger.submit_vote(2, emma, VoteType::Like).await.unwrap();

        let stats = ledger.vote_stats(1).await.unwrap();

        assert_eq!(
            stats,
            VoteStats {
                total_votes: 3,
                like_count: 2,
                dislike_count: 1,
                match_count: 1,
                names_remaining: 1,
            }
        );
    }

    #[tokio::test]
    async fn stats_are_zero_without_a_session() {
        let context = testing::context();
        let stats = VoteLedger::new(&context).vote_stats(1).await.unwrap();

        assert_eq!(stats, VoteStats::default());
    }
}
