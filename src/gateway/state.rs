use crate::db::Database;
use crate::user_auth::UserAuthService;

/// Shared gateway state: just the pool and the auth service. All mutable
/// durable state lives in PostgreSQL; requests share nothing in memory.
pub struct AppState {
    pub db: Database,
    pub user_auth: UserAuthService,
}

impl AppState {
    pub fn new(db: Database, user_auth: UserAuthService) -> Self {
        Self { db, user_auth }
    }
}
