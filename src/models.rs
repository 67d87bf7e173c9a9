//! Domain models for the banking back office.
//!
//! Every entity mirrors a `_tb` table in `sql/schema.sql`. Balances and
//! transaction amounts are `NUMERIC(12,2)` in the database and
//! `rust_decimal::Decimal` here; they are never represented as floats.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Lifecycle status of an account or card application.
///
/// Stored as text. Only these three names are recognized; any other action
/// name submitted by a banker is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ApplicationStatus::Pending),
            "approved" => Some(ApplicationStatus::Approved),
            "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }
}

impl TryFrom<String> for ApplicationStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ApplicationStatus::parse(&value).ok_or_else(|| format!("unknown status: {}", value))
    }
}

/// Ledger entry direction. Debits carry negative amounts, credits positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Debit => "debit",
            TransactionType::Credit => "credit",
        }
    }
}

impl TryFrom<String> for TransactionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "debit" => Ok(TransactionType::Debit),
            "credit" => Ok(TransactionType::Credit),
            _ => Err(format!("unknown transaction type: {}", value)),
        }
    }
}

/// Named bundle of three independent capability bits.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Role {
    pub id: i32,
    pub name: String,
    pub admin_permission: bool,
    pub banker_permission: bool,
    pub client_permission: bool,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub password_hash: String,
    pub role_id: i32,
    pub is_active: bool,
    pub is_staff: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Currency {
    pub id: i32,
    pub code: String,
    pub sign: String,
}

/// Open-ended card type lookup (e.g. "debit", "credit").
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CardType {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BankAccount {
    pub id: i64,
    /// External 10-digit account number.
    pub account_number: String,
    pub iban: String,
    pub currency_id: i32,
    #[schema(value_type = String, example = "100.00")]
    pub balance: Decimal,
    pub user_id: i64,
    /// Originating application, when the account was created by approval.
    pub application_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Card {
    pub id: i64,
    /// 16 digits, final digit is the Luhn check digit.
    pub card_number: String,
    pub expiry_date: NaiveDate,
    #[serde(skip_serializing)]
    #[schema(ignore)]
    pub cvv: String,
    pub user_id: i64,
    pub bank_account_id: i64,
    pub card_type_id: i32,
    pub application_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

/// Append-only ledger entry. Never updated or deleted after insert.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Transaction {
    pub id: i64,
    pub transaction_id: String,
    pub bank_account_id: i64,
    /// Signed amount: negative = debit, positive = credit.
    #[schema(value_type = String, example = "-50.00")]
    pub amount: Decimal,
    pub currency_id: i32,
    #[sqlx(try_from = "String")]
    pub tx_type: TransactionType,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BankAccountApplication {
    pub id: i64,
    pub user_id: i64,
    pub currency_id: i32,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct CardApplication {
    pub id: i64,
    pub user_id: i64,
    pub bank_account_id: i64,
    pub card_type_id: i32,
    #[schema(value_type = String, example = "2500.00")]
    pub monthly_salary: Decimal,
    #[sqlx(try_from = "String")]
    pub status: ApplicationStatus,
    /// Rejection reason. Required for card applications, absent for
    /// bank-account applications.
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_status_parse() {
        assert_eq!(ApplicationStatus::parse("pending"), Some(ApplicationStatus::Pending));
        assert_eq!(ApplicationStatus::parse("approved"), Some(ApplicationStatus::Approved));
        assert_eq!(ApplicationStatus::parse("rejected"), Some(ApplicationStatus::Rejected));
        assert_eq!(ApplicationStatus::parse("escalated"), None);
        assert_eq!(ApplicationStatus::parse("Approved"), None);
    }

    #[test]
    fn test_application_status_terminal() {
        assert!(!ApplicationStatus::Pending.is_terminal());
        assert!(ApplicationStatus::Approved.is_terminal());
        assert!(ApplicationStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_transaction_type_roundtrip() {
        assert_eq!(
            TransactionType::try_from("debit".to_string()),
            Ok(TransactionType::Debit)
        );
        assert_eq!(
            TransactionType::try_from("credit".to_string()),
            Ok(TransactionType::Credit)
        );
        assert!(TransactionType::try_from("refund".to_string()).is_err());
        assert_eq!(TransactionType::Debit.as_str(), "debit");
    }
}
