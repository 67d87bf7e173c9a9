use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::models::User;
use crate::policy::{Action, Actor, Target, allowed};
use crate::repository::{RoleRepository, UserRepository};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub role_id: i32,
}

/// Partial update; omitted fields are left untouched.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role_id: Option<i32>,
    pub is_active: Option<bool>,
}

/// Users visible to the actor: admins see bankers, bankers see clients,
/// clients see themselves.
#[utoipa::path(
    get,
    path = "/api/users",
    security(("bearer_jwt" = [])),
    responses((status = 200, description = "Visible users", body = [User]))
)]
pub async fn list(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<User>>, CoreError> {
    let users = UserRepository::list_visible(state.db.pool(), &actor).await?;
    Ok(Json(users))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> Result<Json<User>, CoreError> {
    let user = UserRepository::get_by_id(state.db.pool(), id)
        .await?
        .ok_or(CoreError::NotFound("user"))?;
    let role = RoleRepository::get_by_id(state.db.pool(), user.role_id)
        .await?
        .ok_or(CoreError::NotFound("role"))?;

    let target = Target::User {
        id: user.id,
        is_banker: role.banker_permission,
        is_client: role.client_permission,
    };
    if !allowed(&actor, Action::Read, &target) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }
    Ok(Json(user))
}

/// Update a user record. Admins may edit bankers, bankers may edit clients,
/// clients may edit themselves. A role change additionally requires write
/// permission on a user holding the new role, so a banker cannot promote a
/// client out of their reach.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<User>, CoreError> {
    let user = UserRepository::get_by_id(state.db.pool(), id)
        .await?
        .ok_or(CoreError::NotFound("user"))?;
    let role = RoleRepository::get_by_id(state.db.pool(), user.role_id)
        .await?
        .ok_or(CoreError::NotFound("role"))?;

    let target = Target::User {
        id: user.id,
        is_banker: role.banker_permission,
        is_client: role.client_permission,
    };
    if !allowed(&actor, Action::Write, &target) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }

    if let Some(role_id) = req.role_id
        && role_id != user.role_id
    {
        let new_role = RoleRepository::get_by_id(state.db.pool(), role_id)
            .await?
            .ok_or(CoreError::NotFound("role"))?;
        let new_target = Target::User {
            id: user.id,
            is_banker: new_role.banker_permission,
            is_client: new_role.client_permission,
        };
        if !allowed(&actor, Action::Write, &new_target) {
            return Err(CoreError::Unauthorized("Not allowed".to_string()));
        }
    }

    if let Some(username) = &req.username {
        if username.trim().is_empty() {
            return Err(CoreError::Validation("username is required".to_string()));
        }
        if let Some(existing) = UserRepository::get_by_username(state.db.pool(), username).await?
            && existing.id != id
        {
            return Err(CoreError::Validation("Username already exists".to_string()));
        }
    }

    let password_hash = match &req.password {
        Some(password) => Some(
            state
                .user_auth
                .hash_password(password)
                .map_err(|e| CoreError::Internal(e.to_string()))?,
        ),
        None => None,
    };

    let user = UserRepository::update(
        state.db.pool(),
        id,
        req.username.as_deref(),
        password_hash.as_deref(),
        req.role_id,
        req.is_active,
    )
    .await?;

    tracing::info!(user_id = id, "user updated");
    Ok(Json(user))
}

/// Create a user. Admins may create bankers, bankers may create clients.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CreateUserRequest>,
) -> Result<Json<User>, CoreError> {
    let role = RoleRepository::get_by_id(state.db.pool(), req.role_id)
        .await?
        .ok_or(CoreError::NotFound("role"))?;

    let target = Target::User {
        id: -1,
        is_banker: role.banker_permission,
        is_client: role.client_permission,
    };
    if !allowed(&actor, Action::Write, &target) {
        return Err(CoreError::Unauthorized("Not allowed".to_string()));
    }

    if req.username.trim().is_empty() {
        return Err(CoreError::Validation("username is required".to_string()));
    }
    if UserRepository::get_by_username(state.db.pool(), &req.username)
        .await?
        .is_some()
    {
        return Err(CoreError::Validation("Username already exists".to_string()));
    }

    let password_hash = state
        .user_auth
        .hash_password(&req.password)
        .map_err(|e| CoreError::Internal(e.to_string()))?;

    let user =
        UserRepository::create(state.db.pool(), &req.username, &password_hash, req.role_id).await?;

    tracing::info!(user_id = user.id, role_id = req.role_id, "user created");
    Ok(Json(user))
}
