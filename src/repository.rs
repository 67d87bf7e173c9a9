//! Repository layer for database operations.
//!
//! Plain CRUD only: balance-changing writes and application decisions never
//! go through here, they live in [`crate::transfer`] and
//! [`crate::application`] behind their transactional boundaries.

use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::models::{
    BankAccount, BankAccountApplication, Card, CardApplication, CardType, Currency, Role,
    Transaction, User,
};
use crate::policy::{Actor, RoleCaps};

const USER_COLUMNS: &str =
    "id, username, password_hash, role_id, is_active, is_staff, last_login, created_at";

/// User repository for CRUD operations
pub struct UserRepository;

impl UserRepository {
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {} FROM users_tb WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn get_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {} FROM users_tb WHERE username = $1", USER_COLUMNS))
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Capability bits of a user's role, for building an [`Actor`].
    pub async fn get_caps(pool: &PgPool, user_id: i64) -> Result<Option<RoleCaps>, sqlx::Error> {
        let role: Option<Role> = sqlx::query_as(
            r#"SELECT r.id, r.name, r.admin_permission, r.banker_permission, r.client_permission
               FROM roles_tb r JOIN users_tb u ON u.role_id = r.id
               WHERE u.id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(role.map(|r| RoleCaps::from(&r)))
    }

    /// Users visible to the actor: admins see bankers, bankers see clients,
    /// clients see themselves.
    pub async fn list_visible(pool: &PgPool, actor: &Actor) -> Result<Vec<User>, sqlx::Error> {
        if actor.caps.admin || actor.caps.banker {
            let capability_column = if actor.caps.admin {
                "r.banker_permission"
            } else {
                "r.client_permission"
            };
            sqlx::query_as(&format!(
                r#"SELECT u.id, u.username, u.password_hash, u.role_id, u.is_active,
                          u.is_staff, u.last_login, u.created_at
                   FROM users_tb u
                   JOIN roles_tb r ON r.id = u.role_id
                   WHERE {} ORDER BY u.id"#,
                capability_column
            ))
            .fetch_all(pool)
            .await
        } else {
            sqlx::query_as(&format!("SELECT {} FROM users_tb WHERE id = $1", USER_COLUMNS))
                .bind(actor.user_id)
                .fetch_all(pool)
                .await
        }
    }

    pub async fn create(
        pool: &PgPool,
        username: &str,
        password_hash: &str,
        role_id: i32,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as(&format!(
            r#"INSERT INTO users_tb (username, password_hash, role_id)
               VALUES ($1, $2, $3)
               RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role_id)
        .fetch_one(pool)
        .await
    }

    /// Partial update; `None` fields keep their current value.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        username: Option<&str>,
        password_hash: Option<&str>,
        role_id: Option<i32>,
        is_active: Option<bool>,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as(&format!(
            r#"UPDATE users_tb
               SET username = COALESCE($1, username),
                   password_hash = COALESCE($2, password_hash),
                   role_id = COALESCE($3, role_id),
                   is_active = COALESCE($4, is_active)
               WHERE id = $5
               RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(username)
        .bind(password_hash)
        .bind(role_id)
        .bind(is_active)
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// id -> username pairs, for building account projections.
    pub async fn usernames(pool: &PgPool) -> Result<Vec<(i64, String)>, sqlx::Error> {
        sqlx::query_as("SELECT id, username FROM users_tb")
            .fetch_all(pool)
            .await
    }

    pub async fn touch_last_login(pool: &PgPool, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users_tb SET last_login = NOW() WHERE id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

pub struct RoleRepository;

impl RoleRepository {
    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Role>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, name, admin_permission, banker_permission, client_permission
               FROM roles_tb WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Role>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, name, admin_permission, banker_permission, client_permission
               FROM roles_tb ORDER BY id"#,
        )
        .fetch_all(pool)
        .await
    }
}

pub struct CurrencyRepository;

impl CurrencyRepository {
    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<Currency>, sqlx::Error> {
        sqlx::query_as("SELECT id, code, sign FROM currencies_tb WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Currency>, sqlx::Error> {
        sqlx::query_as("SELECT id, code, sign FROM currencies_tb ORDER BY id")
            .fetch_all(pool)
            .await
    }
}

pub struct CardTypeRepository;

impl CardTypeRepository {
    pub async fn get_by_id(pool: &PgPool, id: i32) -> Result<Option<CardType>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM card_types_tb WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<CardType>, sqlx::Error> {
        sqlx::query_as("SELECT id, name FROM card_types_tb ORDER BY id")
            .fetch_all(pool)
            .await
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, account_number, iban, currency_id, balance, user_id, application_id, created_at";

pub struct BankAccountRepository;

impl BankAccountRepository {
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<BankAccount>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM bank_accounts_tb WHERE id = $1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// All accounts; clients get them too, redacted by the policy projection.
    pub async fn list(pool: &PgPool) -> Result<Vec<BankAccount>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM bank_accounts_tb ORDER BY id",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(pool)
        .await
    }

    /// Sum of ledger amounts for one account; equals the stored balance
    /// whenever the ledger-consistency invariant holds.
    pub async fn ledger_sum(pool: &PgPool, account_id: i64) -> Result<Decimal, sqlx::Error> {
        let sum: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM transactions_tb WHERE bank_account_id = $1",
        )
        .bind(account_id)
        .fetch_one(pool)
        .await?;
        Ok(sum.unwrap_or(Decimal::ZERO))
    }
}

const CARD_COLUMNS: &str = "id, card_number, expiry_date, cvv, user_id, bank_account_id, \
                            card_type_id, application_id, created_at";

pub struct CardRepository;

impl CardRepository {
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<Card>, sqlx::Error> {
        sqlx::query_as(&format!("SELECT {} FROM cards_tb WHERE id = $1", CARD_COLUMNS))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_visible(pool: &PgPool, actor: &Actor) -> Result<Vec<Card>, sqlx::Error> {
        if actor.caps.admin || actor.caps.banker {
            sqlx::query_as(&format!("SELECT {} FROM cards_tb ORDER BY id", CARD_COLUMNS))
                .fetch_all(pool)
                .await
        } else {
            sqlx::query_as(&format!(
                "SELECT {} FROM cards_tb WHERE user_id = $1 ORDER BY id",
                CARD_COLUMNS
            ))
            .bind(actor.user_id)
            .fetch_all(pool)
            .await
        }
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, transaction_id, bank_account_id, amount, currency_id, tx_type, created_at";

pub struct TransactionRepository;

impl TransactionRepository {
    /// Transactions visible to the actor: bankers and admins see the whole
    /// ledger, clients only entries of accounts they own.
    pub async fn list_visible(pool: &PgPool, actor: &Actor) -> Result<Vec<Transaction>, sqlx::Error> {
        if actor.caps.admin || actor.caps.banker {
            sqlx::query_as(&format!(
                "SELECT {} FROM transactions_tb ORDER BY id",
                TRANSACTION_COLUMNS
            ))
            .fetch_all(pool)
            .await
        } else {
            sqlx::query_as(&format!(
                r#"SELECT {} FROM transactions_tb
                   WHERE bank_account_id IN
                       (SELECT id FROM bank_accounts_tb WHERE user_id = $1)
                   ORDER BY id"#,
                TRANSACTION_COLUMNS
            ))
            .bind(actor.user_id)
            .fetch_all(pool)
            .await
        }
    }

    pub async fn list_by_account(
        pool: &PgPool,
        account_id: i64,
    ) -> Result<Vec<Transaction>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM transactions_tb WHERE bank_account_id = $1 ORDER BY id",
            TRANSACTION_COLUMNS
        ))
        .bind(account_id)
        .fetch_all(pool)
        .await
    }
}

pub struct BankAccountApplicationRepository;

impl BankAccountApplicationRepository {
    pub async fn get_by_id(
        pool: &PgPool,
        id: i64,
    ) -> Result<Option<BankAccountApplication>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, user_id, currency_id, status, created_at
               FROM bank_account_applications_tb WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_visible(
        pool: &PgPool,
        actor: &Actor,
    ) -> Result<Vec<BankAccountApplication>, sqlx::Error> {
        if actor.caps.admin || actor.caps.banker {
            sqlx::query_as(
                r#"SELECT id, user_id, currency_id, status, created_at
                   FROM bank_account_applications_tb ORDER BY id"#,
            )
            .fetch_all(pool)
            .await
        } else {
            sqlx::query_as(
                r#"SELECT id, user_id, currency_id, status, created_at
                   FROM bank_account_applications_tb WHERE user_id = $1 ORDER BY id"#,
            )
            .bind(actor.user_id)
            .fetch_all(pool)
            .await
        }
    }
}

pub struct CardApplicationRepository;

impl CardApplicationRepository {
    pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Option<CardApplication>, sqlx::Error> {
        sqlx::query_as(
            r#"SELECT id, user_id, bank_account_id, card_type_id, monthly_salary,
                      status, reason, created_at
               FROM card_applications_tb WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list_visible(
        pool: &PgPool,
        actor: &Actor,
    ) -> Result<Vec<CardApplication>, sqlx::Error> {
        if actor.caps.admin || actor.caps.banker {
            sqlx::query_as(
                r#"SELECT id, user_id, bank_account_id, card_type_id, monthly_salary,
                          status, reason, created_at
                   FROM card_applications_tb ORDER BY id"#,
            )
            .fetch_all(pool)
            .await
        } else {
            sqlx::query_as(
                r#"SELECT id, user_id, bank_account_id, card_type_id, monthly_salary,
                          status, reason, created_at
                   FROM card_applications_tb WHERE user_id = $1 ORDER BY id"#,
            )
            .bind(actor.user_id)
            .fetch_all(pool)
            .await
        }
    }
}
