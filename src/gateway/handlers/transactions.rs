use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::models::Transaction;
use crate::policy::{Action, Actor, Target, allowed};
use crate::repository::TransactionRepository;

/// Ledger entries visible to the actor: bankers and admins see the whole
/// ledger, clients only entries of accounts they own.
#[utoipa::path(
    get,
    path = "/api/transactions",
    security(("bearer_jwt" = [])),
    responses((status = 200, description = "Visible ledger entries", body = [Transaction]))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Transaction>>, CoreError> {
    if !allowed(&actor, Action::Read, &Target::Transaction { account_owner: actor.user_id }) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }
    let transactions = TransactionRepository::list_visible(state.db.pool(), &actor).await?;
    Ok(Json(transactions))
}
