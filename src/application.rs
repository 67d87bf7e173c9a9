//! Application state machine for account opening and card issuance.
//!
//! Lifecycle: `pending -> approved` or `pending -> rejected`, both terminal.
//! Approval side effects (account or card creation) and the status update
//! commit as one transaction: if the resource insert fails the application
//! stays pending.
//!
//! The status update itself is a compare-and-swap (`WHERE status =
//! 'pending'`) on the row already locked `FOR UPDATE`, so a second decision
//! racing the first always observes the terminal state and fails with a
//! conflict.

use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};

use crate::error::{CoreError, CoreResult};
use crate::idgen;
use crate::models::{ApplicationStatus, BankAccountApplication, CardApplication};
use crate::policy::{Action, Actor, Target, allowed};
use crate::repository::{CardTypeRepository, CurrencyRepository};

/// Banker's decision on a pending application.
#[derive(Debug, Clone)]
pub struct Decision {
    pub action: String,
    pub reason: Option<String>,
}

/// Extract a decision from the raw request body.
///
/// The `action` field is required; `reason` is passed through and validated
/// by the card rejection path only.
pub fn parse_decision(data: &Value) -> CoreResult<Decision> {
    let action = data
        .get("action")
        .ok_or_else(|| CoreError::Validation("Action is required".to_string()))?;
    let action = action
        .as_str()
        .ok_or_else(|| CoreError::Validation("Action is required".to_string()))?
        .to_string();

    let reason = data.get("reason").and_then(|r| r.as_str()).map(str::to_string);

    Ok(Decision { action, reason })
}

fn require_banker(actor: &Actor) -> CoreResult<()> {
    // Target ownership is irrelevant for Decide, only the capability bit.
    if allowed(actor, Action::Decide, &Target::Application { owner: 0 }) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized("Banker permission required".to_string()))
    }
}

fn require_client(actor: &Actor) -> CoreResult<()> {
    if actor.caps.client {
        Ok(())
    } else {
        Err(CoreError::Unauthorized("Client permission required".to_string()))
    }
}

/// Client files an account-opening application. Starts pending.
pub async fn apply_bank_account(
    pool: &PgPool,
    actor: &Actor,
    currency_id: i32,
) -> CoreResult<BankAccountApplication> {
    require_client(actor)?;

    if CurrencyRepository::get_by_id(pool, currency_id).await?.is_none() {
        return Err(CoreError::NotFound("currency"));
    }

    let application: BankAccountApplication = sqlx::query_as(
        r#"INSERT INTO bank_account_applications_tb (user_id, currency_id, status)
           VALUES ($1, $2, 'pending')
           RETURNING id, user_id, currency_id, status, created_at"#,
    )
    .bind(actor.user_id)
    .bind(currency_id)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        application_id = application.id,
        user_id = actor.user_id,
        "bank account application filed"
    );
    Ok(application)
}

/// Client files a card application against one of their own accounts.
pub async fn apply_card(
    pool: &PgPool,
    actor: &Actor,
    bank_account_id: i64,
    card_type_id: i32,
    monthly_salary: Decimal,
) -> CoreResult<CardApplication> {
    require_client(actor)?;

    let owner: Option<i64> =
        sqlx::query_scalar("SELECT user_id FROM bank_accounts_tb WHERE id = $1")
            .bind(bank_account_id)
            .fetch_optional(pool)
            .await?;
    match owner {
        None => return Err(CoreError::BusinessRule("Invalid bank account".to_string())),
        Some(owner) if owner != actor.user_id => {
            return Err(CoreError::BusinessRule("Invalid bank account".to_string()));
        }
        Some(_) => {}
    }

    if CardTypeRepository::get_by_id(pool, card_type_id).await?.is_none() {
        return Err(CoreError::NotFound("card type"));
    }

    let application: CardApplication = sqlx::query_as(
        r#"INSERT INTO card_applications_tb
               (user_id, bank_account_id, card_type_id, monthly_salary, status)
           VALUES ($1, $2, $3, $4, 'pending')
           RETURNING id, user_id, bank_account_id, card_type_id, monthly_salary,
                     status, reason, created_at"#,
    )
    .bind(actor.user_id)
    .bind(bank_account_id)
    .bind(card_type_id)
    .bind(monthly_salary)
    .fetch_one(pool)
    .await?;

    tracing::info!(
        application_id = application.id,
        user_id = actor.user_id,
        "card application filed"
    );
    Ok(application)
}

/// Banker decides a bank-account application.
///
/// Approval generates a unique account number and IBAN, creates a
/// zero-balance account owned by the applicant in the requested currency,
/// and marks the application approved, atomically. Rejection needs no
/// reason for this application kind.
pub async fn decide_bank_account(
    pool: &PgPool,
    actor: &Actor,
    application_id: i64,
    decision: &Decision,
) -> CoreResult<()> {
    require_banker(actor)?;

    let status = ApplicationStatus::parse(&decision.action)
        .filter(ApplicationStatus::is_terminal)
        .ok_or_else(|| CoreError::BusinessRule("Invalid action".to_string()))?;

    let mut tx = pool.begin().await?;

    let application: Option<BankAccountApplication> = sqlx::query_as(
        r#"SELECT id, user_id, currency_id, status, created_at
           FROM bank_account_applications_tb WHERE id = $1 FOR UPDATE"#,
    )
    .bind(application_id)
    .fetch_optional(&mut *tx)
    .await?;
    let application = application.ok_or(CoreError::NotFound("application"))?;

    if application.status.is_terminal() {
        return Err(CoreError::Conflict("Application already processed".to_string()));
    }

    if status == ApplicationStatus::Approved {
        let account_id = insert_account(&mut tx, &application).await?;
        tracing::info!(
            application_id,
            account_id,
            user_id = application.user_id,
            "bank account application approved"
        );
    } else {
        tracing::info!(application_id, "bank account application rejected");
    }

    mark_processed(
        &mut tx,
        "bank_account_applications_tb",
        application_id,
        status,
        None,
    )
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Banker decides a card application.
///
/// Approval generates a Luhn-valid card number, expiry and CVV and creates
/// the card against the requested account and card type. Rejection requires
/// a non-empty textual reason, which is stored on the application.
pub async fn decide_card(
    pool: &PgPool,
    actor: &Actor,
    application_id: i64,
    decision: &Decision,
) -> CoreResult<()> {
    require_banker(actor)?;

    let status = ApplicationStatus::parse(&decision.action)
        .filter(ApplicationStatus::is_terminal)
        .ok_or_else(|| CoreError::BusinessRule("Invalid action".to_string()))?;

    let mut tx = pool.begin().await?;

    let application: Option<CardApplication> = sqlx::query_as(
        r#"SELECT id, user_id, bank_account_id, card_type_id, monthly_salary,
                  status, reason, created_at
           FROM card_applications_tb WHERE id = $1 FOR UPDATE"#,
    )
    .bind(application_id)
    .fetch_optional(&mut *tx)
    .await?;
    let application = application.ok_or(CoreError::NotFound("application"))?;

    // Already-processed wins over the missing-reason complaint: a terminal
    // application reports the conflict no matter what the body carries.
    if application.status.is_terminal() {
        return Err(CoreError::Conflict("Application already processed".to_string()));
    }

    if status == ApplicationStatus::Rejected
        && decision.reason.as_deref().is_none_or(|r| r.trim().is_empty())
    {
        return Err(CoreError::Validation("Reason is required".to_string()));
    }

    let reason = match status {
        ApplicationStatus::Approved => {
            let card_id = insert_card(&mut tx, &application).await?;
            tracing::info!(
                application_id,
                card_id,
                user_id = application.user_id,
                "card application approved"
            );
            None
        }
        _ => {
            tracing::info!(application_id, "card application rejected");
            decision.reason.as_deref()
        }
    };

    mark_processed(&mut tx, "card_applications_tb", application_id, status, reason).await?;

    tx.commit().await?;
    Ok(())
}

/// Insert the approval-created bank account, regenerating identifiers on
/// unique-index conflict. Candidates are checked by the insert itself, so
/// there is no window between the uniqueness check and the write.
async fn insert_account(
    tx: &mut PgTransaction<'_, Postgres>,
    application: &BankAccountApplication,
) -> CoreResult<i64> {
    loop {
        let account_number = idgen::account_number(idgen::ACCOUNT_NUMBER_LEN);
        let iban = idgen::iban();

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"INSERT INTO bank_accounts_tb
                   (account_number, iban, currency_id, balance, user_id, application_id)
               VALUES ($1, $2, $3, 0, $4, $5)
               ON CONFLICT DO NOTHING
               RETURNING id"#,
        )
        .bind(&account_number)
        .bind(&iban)
        .bind(application.currency_id)
        .bind(application.user_id)
        .bind(application.id)
        .fetch_optional(&mut **tx)
        .await?;

        match inserted {
            Some(id) => return Ok(id),
            None => {
                tracing::warn!(account_number, "account identifier collision, regenerating");
            }
        }
    }
}

/// Insert the approval-created card, regenerating the card number on
/// unique-index conflict.
async fn insert_card(
    tx: &mut PgTransaction<'_, Postgres>,
    application: &CardApplication,
) -> CoreResult<i64> {
    loop {
        let card_number = idgen::visa_card_number();
        let expiry = idgen::expiry_date(idgen::CARD_YEARS_VALID);
        let cvv = idgen::cvv();

        let inserted: Option<i64> = sqlx::query_scalar(
            r#"INSERT INTO cards_tb
                   (card_number, expiry_date, cvv, user_id, bank_account_id,
                    card_type_id, application_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               ON CONFLICT DO NOTHING
               RETURNING id"#,
        )
        .bind(&card_number)
        .bind(expiry)
        .bind(&cvv)
        .bind(application.user_id)
        .bind(application.bank_account_id)
        .bind(application.card_type_id)
        .bind(application.id)
        .fetch_optional(&mut **tx)
        .await?;

        match inserted {
            Some(id) => return Ok(id),
            None => {
                tracing::warn!("card number collision, regenerating");
            }
        }
    }
}

/// Compare-and-swap the status out of pending. The row is already locked,
/// so zero rows affected means another decision won the race.
async fn mark_processed(
    tx: &mut PgTransaction<'_, Postgres>,
    table: &str,
    application_id: i64,
    status: ApplicationStatus,
    reason: Option<&str>,
) -> CoreResult<()> {
    let result = match reason {
        Some(reason) => {
            sqlx::query(&format!(
                "UPDATE {} SET status = $1, reason = $2 WHERE id = $3 AND status = 'pending'",
                table
            ))
            .bind(status.as_str())
            .bind(reason)
            .bind(application_id)
            .execute(&mut **tx)
            .await?
        }
        None => {
            sqlx::query(&format!(
                "UPDATE {} SET status = $1 WHERE id = $2 AND status = 'pending'",
                table
            ))
            .bind(status.as_str())
            .bind(application_id)
            .execute(&mut **tx)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        return Err(CoreError::Conflict("Application already processed".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_decision_requires_action() {
        let err = parse_decision(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "Action is required");

        let err = parse_decision(&json!({ "action": 7 })).unwrap_err();
        assert_eq!(err.to_string(), "Action is required");
    }

    #[test]
    fn test_parse_decision_passes_reason_through() {
        let decision = parse_decision(&json!({ "action": "rejected", "reason": "low salary" }))
            .unwrap();
        assert_eq!(decision.action, "rejected");
        assert_eq!(decision.reason.as_deref(), Some("low salary"));

        let decision = parse_decision(&json!({ "action": "approved" })).unwrap();
        assert!(decision.reason.is_none());

        // Non-string reasons are dropped, the rejection path then reports
        // the missing reason.
        let decision = parse_decision(&json!({ "action": "rejected", "reason": 5 })).unwrap();
        assert!(decision.reason.is_none());
    }

    #[test]
    fn test_terminal_status_filter() {
        // "pending" is a known status name but not a valid action.
        assert!(
            ApplicationStatus::parse("pending")
                .filter(ApplicationStatus::is_terminal)
                .is_none()
        );
        assert!(
            ApplicationStatus::parse("approved")
                .filter(ApplicationStatus::is_terminal)
                .is_some()
        );
    }
}
