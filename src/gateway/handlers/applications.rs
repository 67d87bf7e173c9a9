use axum::{
    Extension, Json,
    extract::{Path, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::application::{self, parse_decision};
use crate::error::CoreError;
use crate::gateway::state::AppState;
use crate::models::{BankAccountApplication, CardApplication};
use crate::policy::Actor;
use crate::repository::{BankAccountApplicationRepository, CardApplicationRepository};

#[derive(Debug, Deserialize, ToSchema)]
pub struct BankAccountApplicationRequest {
    /// Requested currency id.
    pub currency: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CardApplicationRequest {
    pub bank_account: i64,
    /// Requested card type id.
    pub card_type: i32,
    #[schema(value_type = String, example = "2500.00")]
    pub monthly_salary: Decimal,
}

pub async fn list_bank(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<BankAccountApplication>>, CoreError> {
    let applications =
        BankAccountApplicationRepository::list_visible(state.db.pool(), &actor).await?;
    Ok(Json(applications))
}

pub async fn create_bank(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<BankAccountApplicationRequest>,
) -> Result<Json<BankAccountApplication>, CoreError> {
    let application =
        application::apply_bank_account(state.db.pool(), &actor, req.currency).await?;
    Ok(Json(application))
}

/// Banker decision on a bank-account application. Approval creates the
/// account; both the creation and the status flip commit atomically.
#[utoipa::path(
    post,
    path = "/api/applications/bank-account/{id}/decision",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "Application id")),
    request_body = Value,
    responses(
        (status = 200, description = "Decision applied"),
        (status = 400, description = "Invalid action or already processed"),
        (status = 403, description = "Banker permission required"),
        (status = 404, description = "Unknown application")
    )
)]
pub async fn decide_bank(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, CoreError> {
    let decision = parse_decision(&body)?;
    application::decide_bank_account(state.db.pool(), &actor, id, &decision).await?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn list_card(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> Result<Json<Vec<CardApplication>>, CoreError> {
    let applications = CardApplicationRepository::list_visible(state.db.pool(), &actor).await?;
    Ok(Json(applications))
}

pub async fn create_card(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(req): Json<CardApplicationRequest>,
) -> Result<Json<CardApplication>, CoreError> {
    let application = application::apply_card(
        state.db.pool(),
        &actor,
        req.bank_account,
        req.card_type,
        req.monthly_salary,
    )
    .await?;
    Ok(Json(application))
}

/// Banker decision on a card application. Rejection requires a reason.
#[utoipa::path(
    post,
    path = "/api/applications/card/{id}/decision",
    security(("bearer_jwt" = [])),
    params(("id" = i64, Path, description = "Application id")),
    request_body = Value,
    responses(
        (status = 200, description = "Decision applied"),
        (status = 400, description = "Invalid action, missing reason or already processed"),
        (status = 403, description = "Banker permission required"),
        (status = 404, description = "Unknown application")
    )
)]
pub async fn decide_card(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, CoreError> {
    let decision = parse_decision(&body)?;
    application::decide_card(state.db.pool(), &actor, id, &decision).await?;
    Ok(Json(json!({ "status": "ok" })))
}
