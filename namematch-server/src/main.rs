use std::{env, path::Path, sync::Arc};

use colored::Colorize;
use log::{error, info};
use namematch_collab::{DatabaseError, HttpUserDirectory, NameMatch, PgDatabase, SeedError};
use thiserror::Error;

mod auth;
mod conflicts;
mod context;
mod docs;
mod errors;
mod logging;
mod matches;
mod names;
mod schemas;
mod serialized;
mod server;
mod sessions;
mod votes;

pub use context::ServerContext;
pub use server::Router;

#[derive(Debug, Error)]
enum StartError {
    #[error("NAMEMATCH_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("NAMEMATCH_IDENTITY_URL must be set")]
    MissingIdentityUrl,
    #[error("Could not initialize database: {0}")]
    Database(#[from] DatabaseError),
    #[error("Could not seed the name catalog: {0}")]
    Seed(#[from] SeedError),
}

impl StartError {
    fn hint(&self) -> String {
        match self {
            StartError::MissingDatabaseUrl => {
                "Set NAMEMATCH_DATABASE_URL to a postgres connection string.".to_string()
            }
            StartError::MissingIdentityUrl => {
                "Set NAMEMATCH_IDENTITY_URL to the base url of the identity service.".to_string()
            }
            StartError::Database(_) => {
                "This is a database error. Make sure the postgres instance is running and reachable, then try again.".to_string()
            }
            StartError::Seed(_) => {
                "Check that NAMEMATCH_NAMES_FILE points to a valid names dataset.".to_string()
            }
        }
    }
}

async fn init() -> Result<ServerContext, StartError> {
    let database_url =
        env::var("NAMEMATCH_DATABASE_URL").map_err(|_| StartError::MissingDatabaseUrl)?;
    let identity_url =
        env::var("NAMEMATCH_IDENTITY_URL").map_err(|_| StartError::MissingIdentityUrl)?;

    info!("Connecting to database...");
    let database = PgDatabase::new(&database_url).await?;
    let directory = Arc::new(HttpUserDirectory::new(&identity_url));

    let app = NameMatch::new(database, directory);

    if let Ok(path) = env::var("NAMEMATCH_NAMES_FILE") {
        app.catalog.seed_from_file(Path::new(&path)).await?;
    }

    Ok(ServerContext { app: Arc::new(app) })
}

#[tokio::main]
async fn main() {
    logging::init_logger();

    match init().await {
        Ok(context) => {
            info!("Initialized successfully.");
            server::run_server(context).await;
        }
        Err(error) => {
            error!(
                "{} Read the error below to troubleshoot the issue.",
                "namematch failed to start!".bold().red()
            );
            error!("{}", error);
            error!("{}", format!("Hint: {}", error.hint()).dimmed().italic());
        }
    }
}
