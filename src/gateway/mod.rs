pub mod handlers;
pub mod openapi;
pub mod state;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::GatewayConfig;
use crate::user_auth::jwt_auth_middleware;
use handlers::{accounts, applications, auth, cards, health, lookups, transactions, transfer, users};
use state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/api/logout", post(auth::logout))
        .route("/api/me", get(auth::me))
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/{id}", get(users::get).put(users::update))
        .route("/api/roles", get(lookups::roles))
        .route("/api/currencies", get(lookups::currencies))
        .route("/api/card-types", get(lookups::card_types))
        .route("/api/accounts", get(accounts::list))
        .route("/api/accounts/{id}", get(accounts::get))
        .route("/api/cards", get(cards::list))
        .route("/api/cards/{id}", get(cards::get))
        .route("/api/transactions", get(transactions::list))
        .route(
            "/api/applications/bank-account",
            get(applications::list_bank).post(applications::create_bank),
        )
        .route(
            "/api/applications/bank-account/{id}/decision",
            post(applications::decide_bank),
        )
        .route(
            "/api/applications/card",
            get(applications::list_card).post(applications::create_card),
        )
        .route(
            "/api/applications/card/{id}/decision",
            post(applications::decide_card),
        )
        .route("/api/transfer", post(transfer::create))
        .layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/login", post(auth::login))
        .merge(protected)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
        .with_state(state)
}

/// Bind and serve the gateway until the process exits.
pub async fn run(config: &GatewayConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr, "gateway listening");

    let router = build_router(state);
    axum::serve(listener, router).await?;
    Ok(())
}
