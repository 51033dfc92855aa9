use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::PrimaryKey;

/// An account in the external identity provider.
///
/// This crate never sees credentials, it only resolves who a user is.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: PrimaryKey,
    pub email: String,
    pub display_name: Option<String>,
}

impl UserRecord {
    /// The name to show for this user, falling back to the email when no
    /// display name is set
    pub fn visible_name(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.email.clone())
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user:{0} doesn't exist")]
    UserNotFound(PrimaryKey),
    #[error("token does not resolve to a user")]
    InvalidToken,
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

/// Represents the external identity/credential collaborator.
///
/// Login, registration, and password storage all live behind this boundary.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolves a user by id, used to enrich session views
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserRecord, DirectoryError>;
    /// Resolves the user a bearer token belongs to
    async fn user_by_token(&self, token: &str) -> Result<UserRecord, DirectoryError>;
}

/// A directory backed by a remote identity service over HTTP
pub struct HttpUserDirectory {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteUser {
    id: PrimaryKey,
    email: String,
    display_name: Option<String>,
}

impl From<RemoteUser> for UserRecord {
    fn from(remote: RemoteUser) -> Self {
        Self {
            id: remote.id,
            email: remote.email,
            display_name: remote.display_name,
        }
    }
}

impl HttpUserDirectory {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UserDirectory for HttpUserDirectory {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserRecord, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/users/{}", self.base_url, user_id))
            .send()
            .await
            .map_err(|e| DirectoryError::Internal(Box::new(e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(DirectoryError::UserNotFound(user_id));
        }

        let remote: RemoteUser = response
            .error_for_status()
            .map_err(|e| DirectoryError::Internal(Box::new(e)))?
            .json()
            .await
            .map_err(|e| DirectoryError::Internal(Box::new(e)))?;

        Ok(remote.into())
    }

    async fn user_by_token(&self, token: &str) -> Result<UserRecord, DirectoryError> {
        let response = self
            .client
            .get(format!("{}/identity", self.base_url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| DirectoryError::Internal(Box::new(e)))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(DirectoryError::InvalidToken);
        }

        let remote: RemoteUser = response
            .error_for_status()
            .map_err(|e| DirectoryError::Internal(Box::new(e)))?
            .json()
            .await
            .map_err(|e| DirectoryError::Internal(Box::new(e)))?;

        Ok(remote.into())
    }
}

/// A fixed directory, used by tests and local development
#[derive(Default)]
pub struct MemoryDirectory {
    users: Mutex<HashMap<PrimaryKey, UserRecord>>,
    tokens: Mutex<HashMap<String, PrimaryKey>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: UserRecord) {
        self.users.lock().insert(user.id, user);
    }

    pub fn add_token(&self, token: &str, user_id: PrimaryKey) {
        self.tokens.lock().insert(token.to_string(), user_id);
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserRecord, DirectoryError> {
        self.users
            .lock()
            .get(&user_id)
            .cloned()
            .ok_or(DirectoryError::UserNotFound(user_id))
    }

    async fn user_by_token(&self, token: &str) -> Result<UserRecord, DirectoryError> {
        let user_id = self
            .tokens
            .lock()
            .get(token)
            .copied()
            .ok_or(DirectoryError::InvalidToken)?;

        self.user_by_id(user_id).await
    }
}
