//! Bank back office: role-gated business core for accounts, cards,
//! applications and transfers.
//!
//! # Modules
//!
//! - [`models`] - Domain entities backed by PostgreSQL tables
//! - [`idgen`] - Account number / IBAN / card number / transaction id generation
//! - [`policy`] - Pure role-capability authorization predicate and projections
//! - [`application`] - Application state machine (pending -> approved/rejected)
//! - [`transfer`] - Atomic money transfer engine
//! - [`repository`] - Plain CRUD repositories
//! - [`user_auth`] - Password hashing and JWT session tokens
//! - [`gateway`] - Axum HTTP adapter around the core

pub mod application;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod idgen;
pub mod logging;
pub mod models;
pub mod policy;
pub mod repository;
pub mod transfer;
pub mod user_auth;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use db::Database;
pub use error::{CoreError, CoreResult};
pub use models::{
    ApplicationStatus, BankAccount, BankAccountApplication, Card, CardApplication, CardType,
    Currency, Role, Transaction, TransactionType, User,
};
pub use policy::{AccountView, Action, Actor, RoleCaps, Target, allowed};
pub use transfer::{TransferReceipt, TransferService};
