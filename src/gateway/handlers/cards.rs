use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::models::Card;
use crate::policy::{Action, Actor, Target, allowed};
use crate::repository::CardRepository;

/// Cards visible to the actor: bankers and admins see all, clients their own.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<Card>>, CoreError> {
    if !allowed(&actor, Action::Read, &Target::Card { owner: actor.user_id }) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }
    let cards = CardRepository::list_visible(state.db.pool(), &actor).await?;
    Ok(Json(cards))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<Card>, CoreError> {
    let card = CardRepository::get_by_id(state.db.pool(), id)
        .await?
        .ok_or(CoreError::NotFound("card"))?;

    if !allowed(&actor, Action::Read, &Target::Card { owner: card.user_id }) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }
    Ok(Json(card))
}
