//! Transfer engine: validated, atomic money movement between two accounts.
//!
//! The four mutations (debit entry, credit entry, two balance updates) run
//! inside one database transaction with both account rows locked
//! `FOR UPDATE`, so two concurrent transfers from the same account cannot
//! both pass the balance check; the second blocks on the row lock and
//! re-reads the committed balance.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};
use std::str::FromStr;
use utoipa::ToSchema;

use crate::error::{CoreError, CoreResult};
use crate::idgen;
use crate::models::{BankAccount, TransactionType};
use crate::policy::Actor;
use crate::repository::CurrencyRepository;

const TXN_PREFIX: &str = "TXN";

/// Parsed and type-checked transfer request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub amount: Decimal,
    pub currency_id: i32,
    pub source_account_id: i64,
    pub dest_account_id: i64,
}

/// Ledger entry ids created by a successful transfer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferReceipt {
    pub debit_transaction_id: String,
    pub credit_transaction_id: String,
}

/// Field presence and type checks, in request-field order. Each failure is
/// its own user-facing message; the first failure short-circuits.
pub fn parse_request(data: &Value) -> CoreResult<TransferRequest> {
    let amount = require_field(data, "amount")?;
    let amount = parse_amount(amount)?;

    let currency_id = i32::try_from(require_int(data, "currency")?)
        .map_err(|_| CoreError::Validation("currency must be an integer".to_string()))?;
    let source_account_id = require_int(data, "bank_account")?;
    let dest_account_id = require_int(data, "bank_account_receiver")?;

    Ok(TransferRequest {
        amount,
        currency_id,
        source_account_id,
        dest_account_id,
    })
}

fn require_field<'a>(data: &'a Value, field: &str) -> CoreResult<&'a Value> {
    data.get(field)
        .ok_or_else(|| CoreError::Validation(format!("{} is required", field)))
}

fn require_int(data: &Value, field: &str) -> CoreResult<i64> {
    require_field(data, field)?
        .as_i64()
        .ok_or_else(|| CoreError::Validation(format!("{} must be an integer", field)))
}

/// Amounts arrive as JSON numbers or as decimal strings; floats are
/// round-tripped through their display form to avoid binary artifacts.
fn parse_amount(value: &Value) -> CoreResult<Decimal> {
    let invalid = || CoreError::Validation("amount must be a number".to_string());
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string()).map_err(|_| invalid()),
        Value::String(s) => Decimal::from_str(s).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

pub struct TransferService;

impl TransferService {
    /// Validate and execute a transfer on behalf of `actor`.
    ///
    /// Validation ladder (first failure wins):
    /// 1. fields present and typed, 2. both accounts exist, 3. source owned
    /// by the actor, 4. amount positive, 5. sufficient funds, 6. same
    /// currency, 7. both accounts have a linked card.
    pub async fn execute(
        pool: &PgPool,
        actor: &Actor,
        data: &Value,
    ) -> CoreResult<TransferReceipt> {
        if !actor.caps.client {
            return Err(CoreError::Unauthorized("Client permission required".to_string()));
        }

        let req = parse_request(data)?;

        if CurrencyRepository::get_by_id(pool, req.currency_id).await?.is_none() {
            return Err(CoreError::NotFound("currency"));
        }

        let mut tx = pool.begin().await?;

        // Lock both rows in id order so two opposite transfers cannot
        // deadlock each other.
        let mut lock_order = vec![req.source_account_id, req.dest_account_id];
        lock_order.sort_unstable();
        lock_order.dedup();
        let mut locked: Vec<BankAccount> = Vec::with_capacity(2);
        for id in lock_order {
            if let Some(account) = lock_account(&mut tx, id).await? {
                locked.push(account);
            }
        }

        let find = |id: i64| locked.iter().find(|a| a.id == id).cloned();
        let source = find(req.source_account_id)
            .ok_or_else(|| CoreError::BusinessRule("Invalid bank account".to_string()))?;
        let dest = find(req.dest_account_id)
            .ok_or_else(|| CoreError::BusinessRule("Invalid bank account receiver".to_string()))?;

        if source.user_id != actor.user_id {
            return Err(CoreError::BusinessRule("Invalid bank account".to_string()));
        }

        if req.amount <= Decimal::ZERO {
            return Err(CoreError::BusinessRule("Amount must be greater than 0".to_string()));
        }

        if source.balance < req.amount {
            return Err(CoreError::BusinessRule("Insufficient funds".to_string()));
        }

        if source.currency_id != dest.currency_id {
            return Err(CoreError::BusinessRule(
                "Bank accounts have different currency types".to_string(),
            ));
        }

        if !has_linked_card(&mut tx, source.id).await? {
            return Err(CoreError::BusinessRule(
                "Your bank account does not have a card linked".to_string(),
            ));
        }
        if !has_linked_card(&mut tx, dest.id).await? {
            return Err(CoreError::BusinessRule(
                "Receiver bank account does not have a card linked".to_string(),
            ));
        }

        let debit_transaction_id = insert_ledger_entry(
            &mut tx,
            source.id,
            -req.amount,
            req.currency_id,
            TransactionType::Debit,
        )
        .await?;
        let credit_transaction_id = insert_ledger_entry(
            &mut tx,
            dest.id,
            req.amount,
            req.currency_id,
            TransactionType::Credit,
        )
        .await?;

        sqlx::query("UPDATE bank_accounts_tb SET balance = balance - $1 WHERE id = $2")
            .bind(req.amount)
            .bind(source.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE bank_accounts_tb SET balance = balance + $1 WHERE id = $2")
            .bind(req.amount)
            .bind(dest.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            source_account = source.id,
            dest_account = dest.id,
            amount = %req.amount,
            debit = %debit_transaction_id,
            credit = %credit_transaction_id,
            "transfer committed"
        );

        Ok(TransferReceipt {
            debit_transaction_id,
            credit_transaction_id,
        })
    }
}

async fn lock_account(
    tx: &mut PgTransaction<'_, Postgres>,
    id: i64,
) -> Result<Option<BankAccount>, sqlx::Error> {
    sqlx::query_as(
        r#"SELECT id, account_number, iban, currency_id, balance, user_id,
                  application_id, created_at
           FROM bank_accounts_tb WHERE id = $1 FOR UPDATE"#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

async fn has_linked_card(
    tx: &mut PgTransaction<'_, Postgres>,
    account_id: i64,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM cards_tb WHERE bank_account_id = $1)")
        .bind(account_id)
        .fetch_one(&mut **tx)
        .await
}

/// Append one ledger entry, regenerating the transaction id on conflict.
/// The conflict check happens in the insert itself, inside the transfer's
/// own transaction.
async fn insert_ledger_entry(
    tx: &mut PgTransaction<'_, Postgres>,
    account_id: i64,
    amount: Decimal,
    currency_id: i32,
    tx_type: TransactionType,
) -> CoreResult<String> {
    loop {
        let transaction_id = idgen::transaction_id(TXN_PREFIX);
        let result = sqlx::query(
            r#"INSERT INTO transactions_tb
                   (transaction_id, bank_account_id, amount, currency_id, tx_type)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (transaction_id) DO NOTHING"#,
        )
        .bind(&transaction_id)
        .bind(account_id)
        .bind(amount)
        .bind(currency_id)
        .bind(tx_type.as_str())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(transaction_id);
        }
        tracing::warn!(transaction_id, "transaction id collision, regenerating");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "amount": 50,
            "currency": 1,
            "bank_account": 10,
            "bank_account_receiver": 11,
        })
    }

    #[test]
    fn test_parse_request_ok() {
        let req = parse_request(&valid_body()).unwrap();
        assert_eq!(req.amount, Decimal::from(50));
        assert_eq!(req.currency_id, 1);
        assert_eq!(req.source_account_id, 10);
        assert_eq!(req.dest_account_id, 11);
    }

    #[test]
    fn test_parse_request_accepts_decimal_amounts() {
        let mut body = valid_body();
        body["amount"] = json!("49.99");
        assert_eq!(parse_request(&body).unwrap().amount, Decimal::new(4999, 2));

        body["amount"] = json!(49.5);
        assert_eq!(parse_request(&body).unwrap().amount, Decimal::new(495, 1));
    }

    #[test]
    fn test_parse_request_missing_fields_in_order() {
        let err = parse_request(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "amount is required");

        let err = parse_request(&json!({ "amount": 50 })).unwrap_err();
        assert_eq!(err.to_string(), "currency is required");

        let err = parse_request(&json!({ "amount": 50, "currency": 1 })).unwrap_err();
        assert_eq!(err.to_string(), "bank_account is required");

        let err =
            parse_request(&json!({ "amount": 50, "currency": 1, "bank_account": 10 })).unwrap_err();
        assert_eq!(err.to_string(), "bank_account_receiver is required");
    }

    #[test]
    fn test_parse_request_type_errors() {
        let mut body = valid_body();
        body["amount"] = json!("not-a-number");
        assert_eq!(
            parse_request(&body).unwrap_err().to_string(),
            "amount must be a number"
        );

        let mut body = valid_body();
        body["bank_account"] = json!("ten");
        assert_eq!(
            parse_request(&body).unwrap_err().to_string(),
            "bank_account must be an integer"
        );

        let mut body = valid_body();
        body["currency"] = json!(1.5);
        assert_eq!(
            parse_request(&body).unwrap_err().to_string(),
            "currency must be an integer"
        );
    }

    // A currency id past i32::MAX must fail validation, not wrap around to
    // a low id that happens to exist.
    #[test]
    fn test_parse_request_rejects_out_of_range_currency() {
        let mut body = valid_body();
        body["currency"] = json!(4_294_967_297_i64);
        assert_eq!(
            parse_request(&body).unwrap_err().to_string(),
            "currency must be an integer"
        );

        let mut body = valid_body();
        body["currency"] = json!(-1);
        assert_eq!(parse_request(&body).unwrap().currency_id, -1);
    }

    // Negative and zero amounts pass parsing (they are well-typed) and are
    // rejected by the business-rule ladder, which needs the database.
    #[test]
    fn test_parse_request_keeps_sign() {
        let mut body = valid_body();
        body["amount"] = json!(-5);
        assert_eq!(parse_request(&body).unwrap().amount, Decimal::from(-5));
    }
}
