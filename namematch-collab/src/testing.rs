//! Shared fixtures for the unit tests

use std::sync::Arc;

use crate::{
    AppContext, Database, Gender, MemoryDatabase, MemoryDirectory, NewName, PrimaryKey,
    SessionData, SessionManager, UserRecord,
};

/// A context over the in-memory database with three known accounts:
/// 1 (Ada), 2 (Ben), and 3 (no display name, email only).
pub fn context() -> AppContext<MemoryDatabase> {
    let directory = MemoryDirectory::new();

    directory.add_user(UserRecord {
        id: 1,
        email: "ada@example.com".to_string(),
        display_name: Some("Ada".to_string()),
    });
    directory.add_user(UserRecord {
        id: 2,
        email: "ben@example.com".to_string(),
        display_name: Some("Ben".to_string()),
    });
    directory.add_user(UserRecord {
        id: 3,
        email: "cleo@example.com".to_string(),
        display_name: None,
    });

    AppContext {
        database: Arc::new(MemoryDatabase::new()),
        directory: Arc::new(directory),
    }
}

pub async fn add_name(
    context: &AppContext<MemoryDatabase>,
    text: &str,
    gender: Gender,
    popularity_score: i32,
) -> PrimaryKey {
    let inserted = context
        .database
        .insert_names(vec![NewName {
            text: text.to_string(),
            gender,
            popularity_score,
            origin: None,
        }])
        .await
        .unwrap();

    inserted[0].id
}

/// Creates a session for `initiator` and joins `partner` into it
pub async fn paired_session(
    context: &AppContext<MemoryDatabase>,
    initiator: PrimaryKey,
    partner: PrimaryKey,
    target_gender: Gender,
) -> SessionData {
    let manager = SessionManager::new(context);

    let created = manager
        .create_session(initiator, target_gender)
        .await
        .unwrap();

    manager
        .join_by_code(partner, &created.data.join_code)
        .await
        .unwrap()
        .data
}
