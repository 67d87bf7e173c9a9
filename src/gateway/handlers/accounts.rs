use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::policy::{Action, Actor, Target, account_view, allowed, AccountView};
use crate::repository::{BankAccountRepository, UserRepository};

/// Every account, each projected per the actor's role: bankers and admins
/// see balances, clients see their own accounts in full and everybody
/// else's redacted (id, IBAN and owner only, for transfer lookups).
#[utoipa::path(
    get,
    path = "/api/accounts",
    security(("bearer_jwt" = [])),
    responses((status = 200, description = "Accounts, projected per role", body = [AccountView]))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<AccountView>>, CoreError> {
    if !allowed(&actor, Action::Read, &Target::BankAccount { owner: actor.user_id }) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }

    let accounts = BankAccountRepository::list(state.db.pool()).await?;
    let usernames: HashMap<i64, String> = UserRepository::usernames(state.db.pool())
        .await?
        .into_iter()
        .collect();

    let views = accounts
        .iter()
        .map(|account| {
            let owner = usernames
                .get(&account.user_id)
                .map(String::as_str)
                .unwrap_or_default();
            account_view(&actor, account, owner)
        })
        .collect();
    Ok(Json(views))
}

#[utoipa::path(
    get,
    path = "/api/accounts/{id}",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "Bank account id")),
    responses(
        (status = 200, description = "Account, projected per role", body = AccountView),
        (status = 404, description = "Unknown account")
    )
)]
pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<AccountView>, CoreError> {
    let account = BankAccountRepository::get_by_id(state.db.pool(), id)
        .await?
        .ok_or(CoreError::NotFound("bank account"))?;

    if !allowed(&actor, Action::Read, &Target::BankAccount { owner: account.user_id }) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }

    let owner = UserRepository::get_by_id(state.db.pool(), account.user_id)
        .await?
        .map(|u| u.username)
        .unwrap_or_default();

    Ok(Json(account_view(&actor, &account, &owner)))
}
