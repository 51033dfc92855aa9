use std::sync::Arc;

use axum::extract::FromRef;
use namematch_collab::{NameMatch, PgDatabase};

#[derive(Clone, FromRef)]
pub struct ServerContext {
    pub app: Arc<NameMatch<PgDatabase>>,
}
