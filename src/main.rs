use std::sync::Arc;

use bank_backoffice::config::AppConfig;
use bank_backoffice::db::Database;
use bank_backoffice::gateway::{self, state::AppState};
use bank_backoffice::logging::init_logging;
use bank_backoffice::user_auth::UserAuthService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = std::env::args().nth(1).unwrap_or_else(|| "dev".to_string());
    let config = AppConfig::load(&env);
    let _guard = init_logging(&config);

    tracing::info!(env, "starting bank back office");

    let db = Database::connect(&config.postgres_url).await?;
    db.health_check().await?;

    let user_auth = UserAuthService::new(config.jwt_secret.clone());
    let state = Arc::new(AppState::new(db, user_auth));

    gateway::run(&config.gateway, state).await
}
