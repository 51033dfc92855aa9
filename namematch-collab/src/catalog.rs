use std::path::Path;

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::{AppContext, Database, DatabaseError, Gender, NewName};

/// Names are inserted in batches to keep the one-time load quick
const BATCH_SIZE: usize = 500;

/// Loads the name catalog from a pre-processed dataset.
///
/// The dataset preparation itself happens offline elsewhere, this only
/// consumes its output.
pub struct CatalogSeeder<Db> {
    context: AppContext<Db>,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Could not read names file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Names file is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// The record format emitted by the dataset preprocessor
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawName {
    name_text: String,
    gender: Gender,
    popularity_score: i32,
    origin: Option<String>,
}

impl From<RawName> for NewName {
    fn from(raw: RawName) -> Self {
        Self {
            text: raw.name_text,
            gender: raw.gender,
            popularity_score: raw.popularity_score,
            origin: raw.origin,
        }
    }
}

impl<Db> CatalogSeeder<Db>
where
    Db: Database,
{
    pub fn new(context: &AppContext<Db>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Seeds the catalog from a JSON file, once. Does nothing when names
    /// are already present.
    pub async fn seed_from_file(&self, path: &Path) -> Result<(), SeedError> {
        let existing = self.context.database.count_names().await?;

        if existing > 0 {
            info!("Names already seeded ({existing} in catalog), skipping");
            return Ok(());
        }

        let json = tokio::fs::read_to_string(path).await?;
        let raw: Vec<RawName> = serde_json::from_str(&json)?;

        if raw.is_empty() {
            warn!("Names file {} contains no names", path.display());
            return Ok(());
        }

        let total = raw.len();
        info!("Loading {total} names into the catalog...");

        let names: Vec<NewName> = raw.into_iter().map(Into::into).collect();
        let mut seeded = 0;

        for batch in names.chunks(BATCH_SIZE) {
            self.context.database.insert_names(batch.to_vec()).await?;

            seeded += batch.len();
            info!("Seeded {seeded}/{total} names...");
        }

        info!("Catalog seeded with {total} names");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use std::path::PathBuf;

    fn write_fixture(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn seeds_once_and_skips_after() {
        let context = testing::context();
        let seeder = CatalogSeeder::new(&context);

        let path = write_fixture(
            "namematch-seed-test.json",
            r#"[
                { "nameText": "Emma", "gender": 1, "popularityScore": 90, "origin": "Germanic" },
                { "nameText": "Liam", "gender": 0, "popularityScore": 95, "origin": null },
                { "nameText": "Alex", "gender": 2, "popularityScore": 80 }
            ]"#,
        );

        seeder.seed_from_file(&path).await.unwrap();
        assert_eq!(context.database.count_names().await.unwrap(), 3);

        let emma = context.database.name_by_id(1).await.unwrap();
        assert_eq!(emma.text, "Emma");
        assert_eq!(emma.gender, Gender::Female);
        assert_eq!(emma.origin.as_deref(), Some("Germanic"));

        // A second pass leaves the catalog alone
        seeder.seed_from_file(&path).await.unwrap();
        assert_eq!(context.database.count_names().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn malformed_files_are_rejected() {
        let context = testing::context();
        let seeder = CatalogSeeder::new(&context);

        let path = write_fixture(
            "namematch-seed-malformed.json",
            r#"[{ "nameText": "Emma", "gender": 7, "popularityScore": 90 }]"#,
        );

        let result = seeder.seed_from_file(&path).await;
        assert!(matches!(result, Err(SeedError::Parse(_))));
        assert_eq!(context.database.count_names().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn missing_files_surface_io_errors() {
        let context = testing::context();
        let seeder = CatalogSeeder::new(&context);

        let result = seeder
            .seed_from_file(Path::new("/nonexistent/names.json"))
            .await;

        assert!(matches!(result, Err(SeedError::Io(_))));
    }
}
