use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use std::sync::Arc;

use crate::gateway::state::AppState;
use crate::policy::Actor;
use crate::repository::UserRepository;

type AuthRejection = (StatusCode, Json<serde_json::Value>);

fn unauthorized(message: &str) -> AuthRejection {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

/// Verify the bearer token and resolve the actor.
///
/// Capabilities are read from the user's current role row on every request,
/// not from the token, so a role change takes effect immediately.
pub async fn jwt_auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthRejection> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| unauthorized("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| unauthorized("Invalid token format"))?;

    let claims = state
        .user_auth
        .verify_token(token)
        .map_err(|_| unauthorized("Invalid or expired token"))?;

    let user_id: i64 = claims
        .sub
        .parse()
        .map_err(|_| unauthorized("Invalid user ID in token"))?;

    let caps = UserRepository::get_caps(state.db.pool(), user_id)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to load actor role");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "An error occurred" })),
            )
        })?
        .ok_or_else(|| unauthorized("Unknown user"))?;

    request.extensions_mut().insert(Actor::new(user_id, caps));
    Ok(next.run(request).await)
}
