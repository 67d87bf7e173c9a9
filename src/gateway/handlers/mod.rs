pub mod accounts;
pub mod applications;
pub mod auth;
pub mod cards;
pub mod health;
pub mod lookups;
pub mod transactions;
pub mod transfer;
pub mod users;
