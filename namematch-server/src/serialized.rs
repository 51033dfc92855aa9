//! All schemas that are exposed from endpoints are defined here
//! along with the [ToSerialized] impls

use chrono::{DateTime, Utc};
use namematch_collab::{
    ConflictRecord, MatchRecord, NameData, SessionView, UserRecord, VoteResult,
    VoteStats as CollabVoteStats, VoteView,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    status: &'static str,
    timestamp: DateTime<Utc>,
}

impl Health {
    pub fn now() -> Self {
        Self {
            status: "healthy",
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    email: String,
    display_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    id: Uuid,
    /// 0 = male, 1 = female, 2 = neutral
    target_gender: u8,
    join_code: String,
    partner_link: String,
    /// 0 = waiting for partner, 1 = active, 2 = completed
    status: u8,
    is_initiator: bool,
    initiator_display_name: Option<String>,
    partner_display_name: Option<String>,
    created_at: DateTime<Utc>,
    linked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Name {
    id: i32,
    text: String,
    /// 0 = male, 1 = female, 2 = neutral
    gender: u8,
    popularity_score: i32,
    origin: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    id: i32,
    name: Name,
    /// 0 = like, 1 = dislike
    vote_type: u8,
    voted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    vote_id: i32,
    is_match: bool,
    matched: Option<Match>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    name: Name,
    matched_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    name: Name,
    i_liked_it: bool,
    conflicted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VoteStats {
    total_votes: i64,
    like_count: i64,
    dislike_count: i64,
    match_count: i64,
    names_remaining: i64,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserRecord {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

impl ToSerialized<Session> for SessionView {
    fn to_serialized(&self) -> Session {
        Session {
            id: self.data.id,
            target_gender: self.data.target_gender.into(),
            join_code: self.data.join_code.clone(),
            partner_link: self.data.partner_link.clone(),
            status: self.data.status.into(),
            is_initiator: self.is_initiator,
            initiator_display_name: self.initiator_display_name.clone(),
            partner_display_name: self.partner_display_name.clone(),
            created_at: self.data.created_at,
            linked_at: self.data.linked_at,
        }
    }
}

impl ToSerialized<Name> for NameData {
    fn to_serialized(&self) -> Name {
        Name {
            id: self.id,
            text: self.text.clone(),
            gender: self.gender.into(),
            popularity_score: self.popularity_score,
            origin: self.origin.clone(),
        }
    }
}

impl ToSerialized<Vote> for VoteView {
    fn to_serialized(&self) -> Vote {
        Vote {
            id: self.vote.id,
            name: self.name.to_serialized(),
            vote_type: self.vote.vote_type.into(),
            voted_at: self.vote.voted_at,
        }
    }
}

impl ToSerialized<VoteOutcome> for VoteResult {
    fn to_serialized(&self) -> VoteOutcome {
        VoteOutcome {
            vote_id: self.vote_id,
            is_match: self.is_match,
            matched: self.matched.as_ref().map(|m| m.to_serialized()),
        }
    }
}

impl ToSerialized<Match> for MatchRecord {
    fn to_serialized(&self) -> Match {
        Match {
            name: self.name.to_serialized(),
            matched_at: self.matched_at,
        }
    }
}

impl ToSerialized<Conflict> for ConflictRecord {
    fn to_serialized(&self) -> Conflict {
        Conflict {
            name: self.name.to_serialized(),
            i_liked_it: self.i_liked_it,
            conflicted_at: self.conflicted_at,
        }
    }
}

impl ToSerialized<VoteStats> for CollabVoteStats {
    fn to_serialized(&self) -> VoteStats {
        VoteStats {
            total_votes: self.total_votes,
            like_count: self.like_count,
            dislike_count: self.dislike_count,
            match_count: self.match_count,
            names_remaining: self.names_remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn health_reports_healthy_with_a_current_timestamp() {
        let health = Health::now();

        assert_eq!(health.status, "healthy");
        assert!(Utc::now().signed_duration_since(health.timestamp) < Duration::seconds(5));
    }
}
