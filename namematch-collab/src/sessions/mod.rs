use chrono::Utc;
use log::info;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    util::{random_code, random_string},
    AppContext, Database, DatabaseError, Gender, NewSession, PrimaryKey, SessionData, SessionId,
};

const JOIN_CODE_LENGTH: usize = 6;
const PARTNER_LINK_LENGTH: usize = 12;

/// Creates sessions, pairs partners into them, and looks them up
pub struct SessionManager<Db> {
    context: AppContext<Db>,
}

#[derive(Debug, Error)]
pub enum SessionError {
    /// The user is already initiator or partner of a non-completed session
    #[error("User already has an active session")]
    AlreadyInSession,
    #[error("Session not found")]
    NotFound,
    #[error("Users cannot join their own session")]
    SelfJoin,
    #[error("Session already has a partner")]
    AlreadyPartnered,
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
}

/// A session as seen by one participant, with display names resolved
/// through the user directory
#[derive(Debug, Clone)]
pub struct SessionView {
    pub data: SessionData,
    pub is_initiator: bool,
    pub initiator_display_name: Option<String>,
    pub partner_display_name: Option<String>,
}

impl<Db> SessionManager<Db>
where
    Db: Database,
{
    pub fn new(context: &AppContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Creates a new session with the user as initiator, waiting for a
    /// partner to join
    pub async fn create_session(
        &self,
        user_id: PrimaryKey,
        target_gender: Gender,
    ) -> Result<SessionView, SessionError> {
        self.ensure_not_in_session(user_id).await?;

        let join_code = self.generate_unique_join_code().await?;

        let new_session = NewSession {
            id: Uuid::new_v4(),
            initiator_id: user_id,
            target_gender,
            join_code,
            partner_link: random_string(PARTNER_LINK_LENGTH),
            created_at: Utc::now(),
        };

        let session = self
            .context
            .database
            .create_session(new_session)
            .await
            .map_err(SessionError::Db)?;

        info!(
            "User {} created session {} with join code {}",
            user_id, session.id, session.join_code
        );

        Ok(self.view_of(session, user_id).await)
    }

    /// Joins a session by its shareable code. Comparison is
    /// case-insensitive.
    pub async fn join_by_code(
        &self,
        user_id: PrimaryKey,
        join_code: &str,
    ) -> Result<SessionView, SessionError> {
        let normalized = join_code.to_uppercase();

        let session = self
            .context
            .database
            .session_by_join_code(&normalized)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => SessionError::NotFound,
                e => SessionError::Db(e),
            })?;

        self.join(session, user_id).await
    }

    /// Joins a session by its partner link token. Exact match.
    pub async fn join_by_link(
        &self,
        user_id: PrimaryKey,
        partner_link: &str,
    ) -> Result<SessionView, SessionError> {
        let session = self
            .context
            .database
            .session_by_partner_link(partner_link)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => SessionError::NotFound,
                e => SessionError::Db(e),
            })?;

        self.join(session, user_id).await
    }

    /// Returns the user's non-completed session, if any
    pub async fn current_session(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Option<SessionView>, SessionError> {
        match self.context.database.session_for_user(user_id).await {
            Ok(session) => Ok(Some(self.view_of(session, user_id).await)),
            Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(SessionError::Db(e)),
        }
    }

    /// Returns the session only if the user participates in it. Outsiders
    /// get none rather than a forbidden error, so they can't probe which
    /// ids exist.
    pub async fn session_by_id(
        &self,
        session_id: SessionId,
        user_id: PrimaryKey,
    ) -> Result<Option<SessionView>, SessionError> {
        match self.context.database.session_by_id(session_id).await {
            Ok(session) if session.is_participant(user_id) => {
                Ok(Some(self.view_of(session, user_id).await))
            }
            Ok(_) | Err(DatabaseError::NotFound { .. }) => Ok(None),
            Err(e) => Err(SessionError::Db(e)),
        }
    }

    /// The shared join procedure behind both join operations
    async fn join(
        &self,
        session: SessionData,
        user_id: PrimaryKey,
    ) -> Result<SessionView, SessionError> {
        if session.initiator_id == user_id {
            return Err(SessionError::SelfJoin);
        }

        if let Some(partner_id) = session.partner_id {
            // Re-joining a session the user is already partnered into is a
            // no-op, anyone else is turned away
            if partner_id == user_id {
                return Ok(self.view_of(session, user_id).await);
            }

            return Err(SessionError::AlreadyPartnered);
        }

        self.ensure_not_in_session(user_id).await?;

        let linked = self
            .context
            .database
            .attach_partner(session.id, user_id, Utc::now())
            .await
            .map_err(SessionError::Db)?;

        info!("User {} joined session {}", user_id, linked.id);

        Ok(self.view_of(linked, user_id).await)
    }

    async fn ensure_not_in_session(&self, user_id: PrimaryKey) -> Result<(), SessionError> {
        match self.context.database.session_for_user(user_id).await {
            Ok(_) => Err(SessionError::AlreadyInSession),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(SessionError::Db(e)),
        }
    }

    /// Draws codes until one is free. Best effort, the unique index on
    /// join_code is the real guard against a concurrent winner.
    async fn generate_unique_join_code(&self) -> Result<String, SessionError> {
        loop {
            let code = random_code(JOIN_CODE_LENGTH);

            match self.context.database.session_by_join_code(&code).await {
                Ok(_) => continue,
                Err(DatabaseError::NotFound { .. }) => return Ok(code),
                Err(e) => return Err(SessionError::Db(e)),
            }
        }
    }

    /// Resolves participant display names through the user directory.
    /// Lookups are best effort, a missing account just leaves the name
    /// unset.
    async fn view_of(&self, session: SessionData, user_id: PrimaryKey) -> SessionView {
        let initiator = self
            .context
            .directory
            .user_by_id(session.initiator_id)
            .await
            .ok();

        let partner = match session.partner_id {
            Some(id) => self.context.directory.user_by_id(id).await.ok(),
            None => None,
        };

        SessionView {
            is_initiator: session.initiator_id == user_id,
            initiator_display_name: initiator.map(|u| u.visible_name()),
            partner_display_name: partner.map(|u| u.visible_name()),
            data: session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing, util::JOIN_CODE_ALPHABET, SessionStatus};

    #[tokio::test]
    async fn created_session_waits_for_partner() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let view = manager.create_session(1, Gender::Female).await.unwrap();

        assert_eq!(view.data.status, SessionStatus::WaitingForPartner);
        assert_eq!(view.data.initiator_id, 1);
        assert!(view.data.partner_id.is_none());
        assert!(view.data.linked_at.is_none());
        assert!(view.is_initiator);

        assert_eq!(view.data.join_code.len(), 6);
        assert!(view
            .data
            .join_code
            .bytes()
            .all(|b| JOIN_CODE_ALPHABET.contains(&b)));
        assert_eq!(view.data.partner_link.len(), 12);
    }

    #[tokio::test]
    async fn one_session_per_user_on_create() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        manager.create_session(1, Gender::Female).await.unwrap();
        let result = manager.create_session(1, Gender::Male).await;

        assert!(matches!(result, Err(SessionError::AlreadyInSession)));
    }

    #[tokio::test]
    async fn joining_activates_the_session() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();
        let joined = manager
            .join_by_code(2, &created.data.join_code)
            .await
            .unwrap();

        assert_eq!(joined.data.status, SessionStatus::Active);
        assert_eq!(joined.data.partner_id, Some(2));
        assert!(joined.data.linked_at.is_some());
        assert!(!joined.is_initiator);
    }

    #[tokio::test]
    async fn join_code_is_case_insensitive() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();
        let lowercase = created.data.join_code.to_lowercase();

        let joined = manager.join_by_code(2, &lowercase).await.unwrap();
        assert_eq!(joined.data.id, created.data.id);
    }

    #[tokio::test]
    async fn unknown_code_and_link_are_not_found() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let by_code = manager.join_by_code(2, "ZZZZZZ").await;
        assert!(matches!(by_code, Err(SessionError::NotFound)));

        let by_link = manager.join_by_link(2, "nosuchtoken1").await;
        assert!(matches!(by_link, Err(SessionError::NotFound)));
    }

    #[tokio::test]
    async fn initiator_cannot_join_own_session() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();
        let result = manager.join_by_code(1, &created.data.join_code).await;

        assert!(matches!(result, Err(SessionError::SelfJoin)));
    }

    #[tokio::test]
    async fn partner_rejoin_is_idempotent() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();
        let first = manager
            .join_by_code(2, &created.data.join_code)
            .await
            .unwrap();
        let second = manager
            .join_by_code(2, &created.data.join_code)
            .await
            .unwrap();

        assert_eq!(first.data.linked_at, second.data.linked_at);
        assert_eq!(second.data.partner_id, Some(2));
    }

    #[tokio::test]
    async fn third_user_is_turned_away() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();
        manager
            .join_by_code(2, &created.data.join_code)
            .await
            .unwrap();

        let result = manager.join_by_code(3, &created.data.join_code).await;
        assert!(matches!(result, Err(SessionError::AlreadyPartnered)));
    }

    #[tokio::test]
    async fn joiner_with_own_session_is_rejected() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let first = manager.create_session(1, Gender::Neutral).await.unwrap();
        manager.create_session(2, Gender::Neutral).await.unwrap();

        let result = manager.join_by_code(2, &first.data.join_code).await;
        assert!(matches!(result, Err(SessionError::AlreadyInSession)));
    }

    #[tokio::test]
    async fn join_by_link_pairs_the_partner() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();
        let joined = manager
            .join_by_link(2, &created.data.partner_link)
            .await
            .unwrap();

        assert_eq!(joined.data.status, SessionStatus::Active);
        assert_eq!(joined.data.partner_id, Some(2));
    }

    #[tokio::test]
    async fn current_session_resolves_both_participants() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        assert!(manager.current_session(1).await.unwrap().is_none());

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();
        manager
            .join_by_code(2, &created.data.join_code)
            .await
            .unwrap();

        let for_initiator = manager.current_session(1).await.unwrap().unwrap();
        let for_partner = manager.current_session(2).await.unwrap().unwrap();

        assert_eq!(for_initiator.data.id, created.data.id);
        assert_eq!(for_partner.data.id, created.data.id);
        assert!(for_initiator.is_initiator);
        assert!(!for_partner.is_initiator);
    }

    #[tokio::test]
    async fn session_by_id_hides_existence_from_outsiders() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        let created = manager.create_session(1, Gender::Neutral).await.unwrap();

        let as_outsider = manager.session_by_id(created.data.id, 3).await.unwrap();
        assert!(as_outsider.is_none());

        let as_initiator = manager.session_by_id(created.data.id, 1).await.unwrap();
        assert!(as_initiator.is_some());
    }

    #[tokio::test]
    async fn display_names_fall_back_to_email() {
        let context = testing::context();
        let manager = SessionManager::new(&context);

        // User 3 has no display name set in the test directory
        let view = manager.create_session(3, Gender::Neutral).await.unwrap();

        assert_eq!(
            view.initiator_display_name.as_deref(),
            Some("cleo@example.com")
        );
    }
}
