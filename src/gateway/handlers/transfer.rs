use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::policy::Actor;
use crate::transfer::TransferService;

/// Move money between two accounts.
///
/// The body is validated field by field by the transfer engine so each
/// failure keeps its distinct message; the handler stays out of the way.
#[utoipa::path(
    post,
    path = "/api/transfer",
    security(("bearer_jwt" = [])),
    request_body = Value,
    responses(
        (status = 200, description = "Transfer committed"),
        (status = 400, description = "Validation or business-rule failure"),
        (status = 403, description = "Client permission required")
    )
)]
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, CoreError> {
    TransferService::execute(state.db.pool(), &actor, &body).await?;
    Ok(Json(json!({ "status": "ok" })))
}
