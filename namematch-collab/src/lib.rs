mod catalog;
mod db;
mod directory;
mod matching;
mod names;
mod sessions;
mod util;
mod votes;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use catalog::*;
pub use db::*;
pub use directory::*;
pub use matching::*;
pub use names::*;
pub use sessions::*;
pub use votes::*;

/// The namematch collab system, facilitating session pairing, name
/// selection, and vote reconciliation.
pub struct NameMatch<Db> {
    context: AppContext<Db>,

    pub sessions: SessionManager<Db>,
    pub names: NamePicker<Db>,
    pub votes: VoteLedger<Db>,
    pub matching: MatchResolver<Db>,
    pub catalog: CatalogSeeder<Db>,
}

/// A type passed to the various managers of the system, to access the
/// database and the external user directory.
pub struct AppContext<Db> {
    pub database: Arc<Db>,
    pub directory: Arc<dyn UserDirectory>,
}

impl<Db> NameMatch<Db>
where
    Db: Database,
{
    pub fn new(database: Db, directory: Arc<dyn UserDirectory>) -> Self {
        let context = AppContext {
            database: Arc::new(database),
            directory,
        };

        Self {
            sessions: SessionManager::new(&context),
            names: NamePicker::new(&context, Arc::new(ThreadRngSource)),
            votes: VoteLedger::new(&context),
            matching: MatchResolver::new(&context),
            catalog: CatalogSeeder::new(&context),
            context,
        }
    }

    /// The external identity collaborator this system was built with
    pub fn directory(&self) -> Arc<dyn UserDirectory> {
        self.context.directory.clone()
    }
}

impl<Db> Clone for AppContext<Db> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
            directory: self.directory.clone(),
        }
    }
}
