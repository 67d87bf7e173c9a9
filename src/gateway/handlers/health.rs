use axum::{Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::CoreError;
use crate::gateway::state::AppState;

/// Service and database health.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 500, description = "Database unreachable")
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, CoreError> {
    state.db.health_check().await?;
    Ok(Json(json!({ "status": "ok" })))
}
