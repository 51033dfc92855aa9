use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::{
    Database, DatabaseError, Gender, NameData, NewName, NewSession, NewVote, PrimaryKey, Result,
    SessionData, SessionId, SessionStatus, VoteData, VoteType,
};

/// An in-memory database implementation.
///
/// Backs the unit tests and is handy for local development without a
/// postgres instance. Enforces the same uniqueness rules the postgres
/// schema does.
#[derive(Default)]
pub struct MemoryDatabase {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    names: Vec<NameData>,
    sessions: Vec<SessionData>,
    votes: Vec<VoteData>,
    next_name_id: PrimaryKey,
    next_vote_id: PrimaryKey,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    /// Qualifying names minus the user's voted ones, in descending
    /// popularity order
    fn unvoted(&self, session_id: SessionId, user_id: PrimaryKey, target: Gender) -> Vec<NameData> {
        let voted: Vec<_> = self
            .votes
            .iter()
            .filter(|v| v.session_id == session_id && v.user_id == user_id)
            .map(|v| v.name_id)
            .collect();

        let mut candidates: Vec<_> = self
            .names
            .iter()
            .filter(|n| target.admits(n.gender) && !voted.contains(&n.id))
            .cloned()
            .collect();

        candidates.sort_by(|a, b| {
            b.popularity_score
                .cmp(&a.popularity_score)
                .then(a.id.cmp(&b.id))
        });
        candidates
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    async fn insert_names(&self, new_names: Vec<NewName>) -> Result<Vec<NameData>> {
        let mut inner = self.inner.lock();
        let mut inserted = Vec::with_capacity(new_names.len());

        for name in new_names {
            inner.next_name_id += 1;

            let data = NameData {
                id: inner.next_name_id,
                text: name.text,
                gender: name.gender,
                popularity_score: name.popularity_score,
                origin: name.origin,
            };

            inner.names.push(data.clone());
            inserted.push(data);
        }

        Ok(inserted)
    }

    async fn name_by_id(&self, name_id: PrimaryKey) -> Result<NameData> {
        self.inner
            .lock()
            .names
            .iter()
            .find(|n| n.id == name_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "name",
                identifier: "id",
            })
    }

    async fn count_names(&self) -> Result<i64> {
        Ok(self.inner.lock().names.len() as i64)
    }

    async fn count_candidate_names(&self, target: Gender) -> Result<i64> {
        let count = self
            .inner
            .lock()
            .names
            .iter()
            .filter(|n| target.admits(n.gender))
            .count();

        Ok(count as i64)
    }

    async fn count_unvoted_names(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        target: Gender,
    ) -> Result<i64> {
        Ok(self.inner.lock().unvoted(session_id, user_id, target).len() as i64)
    }

    async fn unvoted_name_at(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        target: Gender,
        offset: i64,
    ) -> Result<NameData> {
        self.inner
            .lock()
            .unvoted(session_id, user_id, target)
            .into_iter()
            .nth(offset as usize)
            .ok_or(DatabaseError::NotFound {
                resource: "name",
                identifier: "offset",
            })
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        let mut inner = self.inner.lock();

        if inner
            .sessions
            .iter()
            .any(|s| s.join_code == new_session.join_code)
        {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "join_code",
                value: new_session.join_code,
            });
        }

        if inner
            .sessions
            .iter()
            .any(|s| s.partner_link == new_session.partner_link)
        {
            return Err(DatabaseError::Conflict {
                resource: "session",
                field: "partner_link",
                value: new_session.partner_link,
            });
        }

        let data = SessionData {
            id: new_session.id,
            initiator_id: new_session.initiator_id,
            partner_id: None,
            target_gender: new_session.target_gender,
            join_code: new_session.join_code,
            partner_link: new_session.partner_link,
            status: SessionStatus::WaitingForPartner,
            created_at: new_session.created_at,
            linked_at: None,
        };

        inner.sessions.push(data.clone());
        Ok(data)
    }

    async fn session_by_id(&self, session_id: SessionId) -> Result<SessionData> {
        self.inner
            .lock()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "id",
            })
    }

    async fn session_by_join_code(&self, join_code: &str) -> Result<SessionData> {
        self.inner
            .lock()
            .sessions
            .iter()
            .find(|s| s.join_code == join_code)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "join_code",
            })
    }

    async fn session_by_partner_link(&self, partner_link: &str) -> Result<SessionData> {
        self.inner
            .lock()
            .sessions
            .iter()
            .find(|s| s.partner_link == partner_link)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "partner_link",
            })
    }

    async fn session_for_user(&self, user_id: PrimaryKey) -> Result<SessionData> {
        self.inner
            .lock()
            .sessions
            .iter()
            .find(|s| s.is_participant(user_id) && s.status != SessionStatus::Completed)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "user",
            })
    }

    async fn active_session_for_user(&self, user_id: PrimaryKey) -> Result<SessionData> {
        self.inner
            .lock()
            .sessions
            .iter()
            .find(|s| s.is_participant(user_id) && s.status == SessionStatus::Active)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "user",
            })
    }

    async fn attach_partner(
        &self,
        session_id: SessionId,
        partner_id: PrimaryKey,
        linked_at: DateTime<Utc>,
    ) -> Result<SessionData> {
        let mut inner = self.inner.lock();

        let session = inner
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or(DatabaseError::NotFound {
                resource: "session",
                identifier: "id",
            })?;

        session.partner_id = Some(partner_id);
        session.status = SessionStatus::Active;
        session.linked_at = Some(linked_at);

        Ok(session.clone())
    }

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData> {
        let mut inner = self.inner.lock();

        let exists = inner.votes.iter().any(|v| {
            v.user_id == new_vote.user_id
                && v.name_id == new_vote.name_id
                && v.session_id == new_vote.session_id
        });

        if exists {
            return Err(DatabaseError::Conflict {
                resource: "vote",
                field: "user:name:session",
                value: format!(
                    "{}:{}:{}",
                    new_vote.user_id, new_vote.name_id, new_vote.session_id
                ),
            });
        }

        inner.next_vote_id += 1;

        let data = VoteData {
            id: inner.next_vote_id,
            user_id: new_vote.user_id,
            name_id: new_vote.name_id,
            session_id: new_vote.session_id,
            vote_type: new_vote.vote_type,
            voted_at: new_vote.voted_at,
        };

        inner.votes.push(data.clone());
        Ok(data)
    }

    async fn vote_for_name(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        name_id: PrimaryKey,
    ) -> Result<VoteData> {
        self.inner
            .lock()
            .votes
            .iter()
            .find(|v| v.session_id == session_id && v.user_id == user_id && v.name_id == name_id)
            .cloned()
            .ok_or(DatabaseError::NotFound {
                resource: "vote",
                identifier: "user:name:session",
            })
    }

    async fn update_vote(
        &self,
        vote_id: PrimaryKey,
        vote_type: VoteType,
        voted_at: DateTime<Utc>,
    ) -> Result<VoteData> {
        let mut inner = self.inner.lock();

        let vote = inner
            .votes
            .iter_mut()
            .find(|v| v.id == vote_id)
            .ok_or(DatabaseError::NotFound {
                resource: "vote",
                identifier: "id",
            })?;

        vote.vote_type = vote_type;
        vote.voted_at = voted_at;

        Ok(vote.clone())
    }

    async fn delete_vote(&self, vote_id: PrimaryKey) -> Result<()> {
        let mut inner = self.inner.lock();

        if !inner.votes.iter().any(|v| v.id == vote_id) {
            return Err(DatabaseError::NotFound {
                resource: "vote",
                identifier: "id",
            });
        }

        inner.votes.retain(|v| v.id != vote_id);
        Ok(())
    }

    async fn votes_by_user(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
    ) -> Result<Vec<VoteData>> {
        let mut votes: Vec<_> = self
            .inner
            .lock()
            .votes
            .iter()
            .filter(|v| v.session_id == session_id && v.user_id == user_id)
            .cloned()
            .collect();

        votes.sort_by(|a, b| b.voted_at.cmp(&a.voted_at).then(b.id.cmp(&a.id)));
        Ok(votes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn new_session(initiator: PrimaryKey, code: &str, link: &str) -> NewSession {
        NewSession {
            id: Uuid::new_v4(),
            initiator_id: initiator,
            target_gender: Gender::Neutral,
            join_code: code.to_string(),
            partner_link: link.to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn join_code_uniqueness_is_enforced() {
        let db = MemoryDatabase::new();

        db.create_session(new_session(1, "ABCDEF", "aaaaaaaaaaaa"))
            .await
            .unwrap();

        let result = db.create_session(new_session(2, "ABCDEF", "bbbbbbbbbbbb")).await;
        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));
    }

    #[tokio::test]
    async fn deleting_a_missing_vote_is_not_found() {
        let db = MemoryDatabase::new();

        let result = db.delete_vote(42).await;
        assert!(matches!(result, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn duplicate_vote_key_is_rejected() {
        let db = MemoryDatabase::new();
        let session = db
            .create_session(new_session(1, "ABCDEF", "aaaaaaaaaaaa"))
            .await
            .unwrap();

        let vote = NewVote {
            user_id: 1,
            name_id: 1,
            session_id: session.id,
            vote_type: VoteType::Like,
            voted_at: Utc::now(),
        };

        db.create_vote(vote).await.unwrap();

        let duplicate = NewVote {
            user_id: 1,
            name_id: 1,
            session_id: session.id,
            vote_type: VoteType::Dislike,
            voted_at: Utc::now(),
        };

        let result = db.create_vote(duplicate).await;
        assert!(matches!(result, Err(DatabaseError::Conflict { .. })));
    }
}
