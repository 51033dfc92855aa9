use std::sync::Arc;

use rand::{thread_rng, Rng};

use crate::{AppContext, Database, DatabaseError, NameData, PrimaryKey, SessionId};

/// A source of uniform randomness for the weighted draw.
///
/// Injectable so tests can drive the picker with a fixed sequence.
pub trait RandomSource: Send + Sync {
    /// A uniform value in [0, 1)
    fn next(&self) -> f64;
}

/// The default source, backed by the thread-local rng
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn next(&self) -> f64 {
        thread_rng().gen::<f64>()
    }
}

/// Selects the next name for a user to vote on, weighted toward popular
/// names
pub struct NamePicker<Db> {
    context: AppContext<Db>,
    random: Arc<dyn RandomSource>,
}

/// Maps a uniform draw to an index into the descending-popularity
/// ordering. Squaring skews the draw toward the front, so the median
/// lands around the 25th-percentile-most-popular position while the tail
/// is still reachable.
fn weighted_offset(count: i64, r: f64) -> i64 {
    (count as f64 * r * r) as i64
}

impl<Db> NamePicker<Db>
where
    Db: Database,
{
    pub fn new(context: &AppContext<Db>, random: Arc<dyn RandomSource>) -> Self {
        Self {
            context: context.clone(),
            random,
        }
    }

    /// Picks a name the user hasn't voted on yet in their active session.
    ///
    /// Returns none when the user has no active session or the candidate
    /// pool is exhausted. An active session is enough, the partner doesn't
    /// have to have voted on anything.
    pub async fn next_unvoted_name(
        &self,
        user_id: PrimaryKey,
    ) -> Result<Option<NameData>, DatabaseError> {
        let session = match self
            .context
            .database
            .active_session_for_user(user_id)
            .await
        {
            Ok(session) => session,
            Err(DatabaseError::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };

        let count = self
            .context
            .database
            .count_unvoted_names(session.id, user_id, session.target_gender)
            .await?;

        if count == 0 {
            return Ok(None);
        }

        let offset = weighted_offset(count, self.random.next());

        let name = self
            .context
            .database
            .unvoted_name_at(session.id, user_id, session.target_gender, offset)
            .await?;

        Ok(Some(name))
    }

    /// How many catalog names qualify under the session's target gender,
    /// ignoring anyone's voted state. 0 for unknown sessions.
    pub async fn name_count_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<i64, DatabaseError> {
        let session = match self.context.database.session_by_id(session_id).await {
            Ok(session) => session,
            Err(DatabaseError::NotFound { .. }) => return Ok(0),
            Err(e) => return Err(e),
        };

        self.context
            .database
            .count_candidate_names(session.target_gender)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{testing, Gender, VoteLedger, VoteType};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use uuid::Uuid;

    /// Replays a fixed sequence of draws, cycling when exhausted
    struct FixedSource {
        values: Vec<f64>,
        cursor: Mutex<usize>,
    }

    impl FixedSource {
        fn new(values: &[f64]) -> Arc<Self> {
            Arc::new(Self {
                values: values.to_vec(),
                cursor: Mutex::new(0),
            })
        }
    }

    impl RandomSource for FixedSource {
        fn next(&self) -> f64 {
            let mut cursor = self.cursor.lock();
            let value = self.values[*cursor % self.values.len()];
            *cursor += 1;
            value
        }
    }

    #[test]
    fn weighted_offset_skews_toward_the_front() {
        assert_eq!(weighted_offset(100, 0.0), 0);
        // The median draw lands in the top quarter
        assert_eq!(weighted_offset(100, 0.5), 25);
        assert_eq!(weighted_offset(100, 0.9), 81);
        // The last slot stays reachable without going out of bounds
        assert_eq!(weighted_offset(10, 0.999), 9);
    }

    #[tokio::test]
    async fn picker_honors_the_gender_filter() {
        let context = testing::context();
        testing::add_name(&context, "Emma", Gender::Female, 90).await;
        testing::add_name(&context, "Liam", Gender::Male, 95).await;
        testing::add_name(&context, "Alex", Gender::Neutral, 80).await;
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        // Sweep the whole unit interval so every candidate position is hit
        let picker = NamePicker::new(&context, FixedSource::new(&[0.0, 0.5, 0.75, 0.99]));

        let mut seen = HashSet::new();
        for _ in 0..16 {
            let name = picker.next_unvoted_name(1).await.unwrap().unwrap();
            assert_ne!(name.text, "Liam");
            seen.insert(name.text);
        }

        assert!(seen.contains("Emma"));
        assert!(seen.contains("Alex"));
    }

    #[tokio::test]
    async fn neutral_target_admits_the_whole_catalog() {
        let context = testing::context();
        testing::add_name(&context, "Emma", Gender::Female, 90).await;
        testing::add_name(&context, "Liam", Gender::Male, 95).await;
        let session = testing::paired_session(&context, 1, 2, Gender::Neutral).await;

        let picker = NamePicker::new(&context, FixedSource::new(&[0.0]));
        assert_eq!(picker.name_count_for_session(session.id).await.unwrap(), 2);

        // Offset 0 of the descending-popularity ordering
        let name = picker.next_unvoted_name(1).await.unwrap().unwrap();
        assert_eq!(name.text, "Liam");
    }

    #[tokio::test]
    async fn voted_names_are_excluded_until_exhaustion() {
        let context = testing::context();
        testing::add_name(&context, "Emma", Gender::Female, 90).await;
        testing::add_name(&context, "Olivia", Gender::Female, 88).await;
        testing::paired_session(&context, 1, 2, Gender::Female).await;

        let picker = NamePicker::new(&context, FixedSource::new(&[0.0]));
        let ledger = VoteLedger::new(&context);

        let first = picker.next_unvoted_name(1).await.unwrap().unwrap();
        ledger
            .submit_vote(1, first.id, VoteType::Like)
            .await
            .unwrap();

        let second = picker.next_unvoted_name(1).await.unwrap().unwrap();
        assert_ne!(second.id, first.id);
        ledger
            .submit_vote(1, second.id, VoteType::Dislike)
            .await
            .unwrap();

        assert!(picker.next_unvoted_name(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn no_active_session_yields_none() {
        let context = testing::context();
        testing::add_name(&context, "Emma", Gender::Female, 90).await;

        let picker = NamePicker::new(&context, FixedSource::new(&[0.0]));
        assert!(picker.next_unvoted_name(1).await.unwrap().is_none());

        // A waiting session isn't enough either
        let manager = crate::SessionManager::new(&context);
        manager.create_session(1, Gender::Female).await.unwrap();
        assert!(picker.next_unvoted_name(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_session_counts_zero() {
        let context = testing::context();
        testing::add_name(&context, "Emma", Gender::Female, 90).await;

        let picker = NamePicker::new(&context, FixedSource::new(&[0.0]));
        let count = picker.name_count_for_session(Uuid::new_v4()).await.unwrap();

        assert_eq!(count, 0);
    }
}
