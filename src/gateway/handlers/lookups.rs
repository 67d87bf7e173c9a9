//! Read-only lookup tables: roles, currencies and card types.

use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::models::{CardType, Currency, Role};
use crate::policy::{Action, Actor, Target, allowed};
use crate::repository::{CardTypeRepository, CurrencyRepository, RoleRepository};

/// Role records are admin-only.
pub async fn roles(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Role>>, CoreError> {
    if !allowed(&actor, Action::Read, &Target::Role) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }
    Ok(Json(RoleRepository::list(state.db.pool()).await?))
}

pub async fn currencies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Currency>>, CoreError> {
    Ok(Json(CurrencyRepository::list(state.db.pool()).await?))
}

pub async fn card_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CardType>>, CoreError> {
    Ok(Json(CardTypeRepository::list(state.db.pool()).await?))
}
