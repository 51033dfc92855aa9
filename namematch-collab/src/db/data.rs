use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// Sessions are keyed by an opaque, globally unique id.
pub type SessionId = Uuid;

/// Raised when a stored or wire value doesn't map to an enum variant
#[derive(Debug, Error)]
#[error("unrecognized {kind} value: {value}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

/// The gender of a catalog name, or the target filter of a session.
///
/// The wire codes (0 = male, 1 = female, 2 = neutral) match the
/// pre-processed catalog format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Gender {
    Male = 0,
    Female = 1,
    Neutral = 2,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Neutral => "neutral",
        }
    }

    /// Returns true if a name of gender `candidate` qualifies under this
    /// target filter. A neutral target admits everything, and neutral names
    /// qualify under any target.
    pub fn admits(&self, candidate: Gender) -> bool {
        matches!(self, Self::Neutral) || candidate == *self || candidate == Gender::Neutral
    }
}

impl From<Gender> for u8 {
    fn from(value: Gender) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Gender {
    type Error = EnumParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Male),
            1 => Ok(Self::Female),
            2 => Ok(Self::Neutral),
            other => Err(EnumParseError {
                kind: "gender",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for Gender {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "neutral" => Ok(Self::Neutral),
            other => Err(EnumParseError {
                kind: "gender",
                value: other.to_string(),
            }),
        }
    }
}

/// How a user voted on a name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum VoteType {
    Like = 0,
    Dislike = 1,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

impl From<VoteType> for u8 {
    fn from(value: VoteType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for VoteType {
    type Error = EnumParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Like),
            1 => Ok(Self::Dislike),
            other => Err(EnumParseError {
                kind: "vote type",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for VoteType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(EnumParseError {
                kind: "vote type",
                value: other.to_string(),
            }),
        }
    }
}

/// The lifecycle state of a session.
///
/// Nothing in this crate ever transitions a session to [SessionStatus::Completed],
/// it exists for an external lifecycle hook. All "current session" lookups
/// filter on `status != completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum SessionStatus {
    WaitingForPartner = 0,
    Active = 1,
    Completed = 2,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WaitingForPartner => "waiting_for_partner",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl From<SessionStatus> for u8 {
    fn from(value: SessionStatus) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for SessionStatus {
    type Error = EnumParseError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::WaitingForPartner),
            1 => Ok(Self::Active),
            2 => Ok(Self::Completed),
            other => Err(EnumParseError {
                kind: "session status",
                value: other.to_string(),
            }),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting_for_partner" => Ok(Self::WaitingForPartner),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(EnumParseError {
                kind: "session status",
                value: other.to_string(),
            }),
        }
    }
}

/// An immutable catalog name. Created once at load time, never mutated.
#[derive(Debug, Clone)]
pub struct NameData {
    pub id: PrimaryKey,
    pub text: String,
    pub gender: Gender,
    /// Higher means more popular
    pub popularity_score: i32,
    pub origin: Option<String>,
}

/// A pairing between two users voting together on names
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: SessionId,
    pub initiator_id: PrimaryKey,
    /// Set exactly once, when a second distinct user joins
    pub partner_id: Option<PrimaryKey>,
    pub target_gender: Gender,
    /// 6 characters, shareable by reading aloud
    pub join_code: String,
    /// 12-character URL-token alternative to the join code
    pub partner_link: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub linked_at: Option<DateTime<Utc>>,
}

impl SessionData {
    pub fn is_participant(&self, user_id: PrimaryKey) -> bool {
        self.initiator_id == user_id || self.partner_id == Some(user_id)
    }

    /// Returns the other participant, if `user_id` is one and a partner exists
    pub fn partner_of(&self, user_id: PrimaryKey) -> Option<PrimaryKey> {
        if self.initiator_id == user_id {
            self.partner_id
        } else if self.partner_id == Some(user_id) {
            Some(self.initiator_id)
        } else {
            None
        }
    }
}

/// One live vote per (user, name, session). Re-voting overwrites in place.
#[derive(Debug, Clone)]
pub struct VoteData {
    pub id: PrimaryKey,
    pub user_id: PrimaryKey,
    pub name_id: PrimaryKey,
    pub session_id: SessionId,
    pub vote_type: VoteType,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewName {
    pub text: String,
    pub gender: Gender,
    pub popularity_score: i32,
    pub origin: Option<String>,
}

#[derive(Debug)]
pub struct NewSession {
    pub id: SessionId,
    pub initiator_id: PrimaryKey,
    pub target_gender: Gender,
    pub join_code: String,
    pub partner_link: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewVote {
    pub user_id: PrimaryKey,
    pub name_id: PrimaryKey,
    pub session_id: SessionId,
    pub vote_type: VoteType,
    pub voted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_gender_admits_neutral_names() {
        assert!(Gender::Female.admits(Gender::Female));
        assert!(Gender::Female.admits(Gender::Neutral));
        assert!(!Gender::Female.admits(Gender::Male));
        assert!(Gender::Neutral.admits(Gender::Male));
        assert!(Gender::Neutral.admits(Gender::Female));
    }

    #[test]
    fn partner_of_resolves_both_sides() {
        let session = SessionData {
            id: Uuid::new_v4(),
            initiator_id: 1,
            partner_id: Some(2),
            target_gender: Gender::Neutral,
            join_code: "ABCDEF".to_string(),
            partner_link: "abcdefghijkl".to_string(),
            status: SessionStatus::Active,
            created_at: Utc::now(),
            linked_at: Some(Utc::now()),
        };

        assert_eq!(session.partner_of(1), Some(2));
        assert_eq!(session.partner_of(2), Some(1));
        assert_eq!(session.partner_of(3), None);
    }
}
