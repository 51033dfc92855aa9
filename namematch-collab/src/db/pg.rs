use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, Error as SqlxError, FromRow, PgPool};

use crate::{
    Database, DatabaseError, Gender, IntoDatabaseError, NameData, NewName, NewSession, NewVote,
    PrimaryKey, Result, SessionData, SessionId, SessionStatus, VoteData, VoteType,
};

/// A postgres database implementation for namematch
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(FromRow)]
struct NameRow {
    id: PrimaryKey,
    text: String,
    gender: String,
    popularity_score: i32,
    origin: Option<String>,
}

#[derive(FromRow)]
struct SessionRow {
    id: SessionId,
    initiator_id: PrimaryKey,
    partner_id: Option<PrimaryKey>,
    target_gender: String,
    join_code: String,
    partner_link: String,
    status: String,
    created_at: DateTime<Utc>,
    linked_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct VoteRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    name_id: PrimaryKey,
    session_id: SessionId,
    vote_type: String,
    voted_at: DateTime<Utc>,
}

impl TryFrom<NameRow> for NameData {
    type Error = DatabaseError;

    fn try_from(row: NameRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            text: row.text,
            gender: row.gender.parse().map_err(|e| any_boxed(e))?,
            popularity_score: row.popularity_score,
            origin: row.origin,
        })
    }
}

impl TryFrom<SessionRow> for SessionData {
    type Error = DatabaseError;

    fn try_from(row: SessionRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            initiator_id: row.initiator_id,
            partner_id: row.partner_id,
            target_gender: row.target_gender.parse().map_err(|e| any_boxed(e))?,
            join_code: row.join_code,
            partner_link: row.partner_link,
            status: row.status.parse().map_err(|e| any_boxed(e))?,
            created_at: row.created_at,
            linked_at: row.linked_at,
        })
    }
}

impl TryFrom<VoteRow> for VoteData {
    type Error = DatabaseError;

    fn try_from(row: VoteRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            name_id: row.name_id,
            session_id: row.session_id,
            vote_type: row.vote_type.parse().map_err(|e| any_boxed(e))?,
            voted_at: row.voted_at,
        })
    }
}

/// Gender filter clause shared by the candidate queries. The target gender
/// binds at `$1`; a neutral target matches the whole catalog.
const GENDER_FILTER: &str = "($1 = 'neutral' OR gender = $1 OR gender = 'neutral')";

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn vote_by_id(&self, vote_id: PrimaryKey) -> Result<VoteData> {
        sqlx::query_as::<_, VoteRow>("SELECT * FROM votes WHERE id = $1")
            .bind(vote_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("vote", "id"))?
            .try_into()
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn insert_names(&self, new_names: Vec<NewName>) -> Result<Vec<NameData>> {
        let mut tx = self.pool.begin().await.map_err(|e| e.any())?;
        let mut inserted = Vec::with_capacity(new_names.len());

        for name in new_names {
            let row = sqlx::query_as::<_, NameRow>(
                "INSERT INTO names (text, gender, popularity_score, origin)
                 VALUES ($1, $2, $3, $4)
                 RETURNING *",
            )
            .bind(&name.text)
            .bind(name.gender.as_str())
            .bind(name.popularity_score)
            .bind(&name.origin)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| e.any())?;

            inserted.push(row.try_into()?);
        }

        tx.commit().await.map_err(|e| e.any())?;
        Ok(inserted)
    }

    async fn name_by_id(&self, name_id: PrimaryKey) -> Result<NameData> {
        sqlx::query_as::<_, NameRow>("SELECT * FROM names WHERE id = $1")
            .bind(name_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("name", "id"))?
            .try_into()
    }

    async fn count_names(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM names")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn count_candidate_names(&self, target: Gender) -> Result<i64> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM names WHERE {GENDER_FILTER}"))
            .bind(target.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.any())
    }

    async fn count_unvoted_names(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        target: Gender,
    ) -> Result<i64> {
        sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM names
             WHERE {GENDER_FILTER}
               AND id NOT IN (
                 SELECT name_id FROM votes WHERE session_id = $2 AND user_id = $3
               )"
        ))
        .bind(target.as_str())
        .bind(session_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())
    }

    async fn unvoted_name_at(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        target: Gender,
        offset: i64,
    ) -> Result<NameData> {
        sqlx::query_as::<_, NameRow>(&format!(
            "SELECT * FROM names
             WHERE {GENDER_FILTER}
               AND id NOT IN (
                 SELECT name_id FROM votes WHERE session_id = $2 AND user_id = $3
               )
             ORDER BY popularity_score DESC, id
             LIMIT 1 OFFSET $4"
        ))
        .bind(target.as_str())
        .bind(session_id)
        .bind(user_id)
        .bind(offset)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("name", "offset"))?
        .try_into()
    }

    async fn create_session(&self, new_session: NewSession) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(
            "INSERT INTO sessions
               (id, initiator_id, target_gender, join_code, partner_link, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(new_session.id)
        .bind(new_session.initiator_id)
        .bind(new_session.target_gender.as_str())
        .bind(&new_session.join_code)
        .bind(&new_session.partner_link)
        .bind(SessionStatus::WaitingForPartner.as_str())
        .bind(new_session.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.conflict_or_any("session", "join_code", &new_session.join_code))?
        .try_into()
    }

    async fn session_by_id(&self, session_id: SessionId) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "id"))?
            .try_into()
    }

    async fn session_by_join_code(&self, join_code: &str) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE join_code = $1")
            .bind(join_code)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "join_code"))?
            .try_into()
    }

    async fn session_by_partner_link(&self, partner_link: &str) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE partner_link = $1")
            .bind(partner_link)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("session", "partner_link"))?
            .try_into()
    }

    async fn session_for_user(&self, user_id: PrimaryKey) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions
             WHERE (initiator_id = $1 OR partner_id = $1) AND status != 'completed'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "user"))?
        .try_into()
    }

    async fn active_session_for_user(&self, user_id: PrimaryKey) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions
             WHERE (initiator_id = $1 OR partner_id = $1) AND status = 'active'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "user"))?
        .try_into()
    }

    async fn attach_partner(
        &self,
        session_id: SessionId,
        partner_id: PrimaryKey,
        linked_at: DateTime<Utc>,
    ) -> Result<SessionData> {
        sqlx::query_as::<_, SessionRow>(
            "UPDATE sessions
             SET partner_id = $1, status = 'active', linked_at = $2
             WHERE id = $3
             RETURNING *",
        )
        .bind(partner_id)
        .bind(linked_at)
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "id"))?
        .try_into()
    }

    async fn create_vote(&self, new_vote: NewVote) -> Result<VoteData> {
        sqlx::query_as::<_, VoteRow>(
            "INSERT INTO votes (user_id, name_id, session_id, vote_type, voted_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(new_vote.user_id)
        .bind(new_vote.name_id)
        .bind(new_vote.session_id)
        .bind(new_vote.vote_type.as_str())
        .bind(new_vote.voted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            e.conflict_or_any(
                "vote",
                "user:name:session",
                &format!(
                    "{}:{}:{}",
                    new_vote.user_id, new_vote.name_id, new_vote.session_id
                ),
            )
        })?
        .try_into()
    }

    async fn vote_for_name(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
        name_id: PrimaryKey,
    ) -> Result<VoteData> {
        sqlx::query_as::<_, VoteRow>(
            "SELECT * FROM votes WHERE session_id = $1 AND user_id = $2 AND name_id = $3",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(name_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("vote", "user:name:session"))?
        .try_into()
    }

    async fn update_vote(
        &self,
        vote_id: PrimaryKey,
        vote_type: VoteType,
        voted_at: DateTime<Utc>,
    ) -> Result<VoteData> {
        sqlx::query("UPDATE votes SET vote_type = $1, voted_at = $2 WHERE id = $3")
            .bind(vote_type.as_str())
            .bind(voted_at)
            .bind(vote_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.vote_by_id(vote_id).await
    }

    async fn delete_vote(&self, vote_id: PrimaryKey) -> Result<()> {
        let result = sqlx::query("DELETE FROM votes WHERE id = $1")
            .bind(vote_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound {
                resource: "vote",
                identifier: "id",
            });
        }

        Ok(())
    }

    async fn votes_by_user(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
    ) -> Result<Vec<VoteData>> {
        sqlx::query_as::<_, VoteRow>(
            "SELECT * FROM votes
             WHERE session_id = $1 AND user_id = $2
             ORDER BY voted_at DESC, id DESC",
        )
        .bind(session_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?
        .into_iter()
        .map(TryInto::try_into)
        .collect()
    }
}

fn any_boxed<E>(e: E) -> DatabaseError
where
    E: std::error::Error + Send + Sync + 'static,
{
    DatabaseError::Internal(Box::new(e))
}

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}

/// Extra mapping for insert paths where a unique index is the backstop
pub trait IntoConflictError {
    fn conflict_or_any(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError;
}

impl IntoConflictError for SqlxError {
    fn conflict_or_any(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> DatabaseError {
        let is_unique_violation = matches!(
            &self,
            SqlxError::Database(e) if e.code().as_deref() == Some(UNIQUE_VIOLATION)
        );

        if is_unique_violation {
            DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }
        } else {
            self.any()
        }
    }
}
