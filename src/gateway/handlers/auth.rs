use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::models::User;
use crate::policy::Actor;
use crate::repository::UserRepository;
use crate::user_auth::{AuthResponse, LoginRequest};

/// Authenticate and issue a session token.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, CoreError> {
    let response = state
        .user_auth
        .login(state.db.pool(), req)
        .await
        .map_err(|e| CoreError::Internal(e.to_string()))?
        .ok_or_else(|| CoreError::BusinessRule("Invalid credentials".to_string()))?;

    tracing::info!(user_id = response.user_id, "user logged in");
    Ok(Json(response))
}

/// Tokens are stateless; logout is client-side discard.
pub async fn logout() -> Json<Value> {
    Json(json!({ "message": "User logged out" }))
}

/// The authenticated user's own record.
#[utoipa::path(
    get,
    path = "/api/me",
    security(("bearer_jwt" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<User>, CoreError> {
    let user = UserRepository::get_by_id(state.db.pool(), actor.user_id)
        .await?
        .ok_or(CoreError::NotFound("user"))?;
    Ok(Json(user))
}
