//! Role-derived access policy.
//!
//! `allowed` is a pure predicate over the three capability bits; it performs
//! no I/O so every (role, action, target) pair can be unit tested. The actor
//! is always passed in explicitly, never read from ambient state.

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{BankAccount, Role};

/// The three independent capability bits of a [`Role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoleCaps {
    pub admin: bool,
    pub banker: bool,
    pub client: bool,
}

impl From<&Role> for RoleCaps {
    fn from(role: &Role) -> Self {
        Self {
            admin: role.admin_permission,
            banker: role.banker_permission,
            client: role.client_permission,
        }
    }
}

/// Authenticated principal handed to every core operation.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: i64,
    pub caps: RoleCaps,
}

impl Actor {
    pub fn new(user_id: i64, caps: RoleCaps) -> Self {
        Self { user_id, caps }
    }

    pub fn owns(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Decide,
}

/// Authorization target, carrying just enough ownership context to decide.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    Role,
    /// `id < 0` means a user that does not exist yet (creation).
    User {
        id: i64,
        is_banker: bool,
        is_client: bool,
    },
    BankAccount {
        owner: i64,
    },
    Card {
        owner: i64,
    },
    Transaction {
        account_owner: i64,
    },
    Application {
        owner: i64,
    },
}

/// Role-derived authorization predicate.
///
/// - admin: manages roles, and user records of bankers only;
/// - banker: manages user records of clients only, read-only on accounts,
///   cards and transactions across all users, decides applications;
/// - client: reads/writes own user, account and card records, reads own
///   transactions and applications, creates applications for themself.
///
/// A client may also Read another user's bank account: the caller must then
/// serve the redacted projection from [`account_view`].
pub fn allowed(actor: &Actor, action: Action, target: &Target) -> bool {
    let caps = actor.caps;
    match (target, action) {
        (Target::Role, Action::Read | Action::Write) => caps.admin,
        (Target::Role, Action::Decide) => false,

        (Target::User { id, is_banker, is_client }, Action::Read | Action::Write) => {
            (caps.admin && *is_banker)
                || (caps.banker && *is_client)
                || (caps.client && actor.owns(*id))
        }
        (Target::User { .. }, Action::Decide) => false,

        // Any client may look up any account (the projection is redacted
        // for accounts they do not own).
        (Target::BankAccount { .. }, Action::Read) => caps.admin || caps.banker || caps.client,
        (Target::BankAccount { owner }, Action::Write) => caps.client && actor.owns(*owner),

        (Target::Card { owner }, Action::Read) => {
            caps.admin || caps.banker || (caps.client && actor.owns(*owner))
        }
        (Target::Card { owner }, Action::Write) => caps.client && actor.owns(*owner),

        (Target::Transaction { account_owner }, Action::Read) => {
            caps.admin || caps.banker || (caps.client && actor.owns(*account_owner))
        }
        (Target::Transaction { .. }, Action::Write) => false,

        (Target::Application { owner }, Action::Read) => {
            caps.admin || caps.banker || (caps.client && actor.owns(*owner))
        }
        (Target::Application { owner }, Action::Write) => caps.client && actor.owns(*owner),
        (Target::Application { .. }, Action::Decide) => caps.banker,

        (Target::BankAccount { .. } | Target::Card { .. } | Target::Transaction { .. }, Action::Decide) => {
            false
        }
    }
}

/// Minimal reference to the owning user inside a redacted account view.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserRef {
    pub id: i64,
    pub username: String,
}

/// Redacted projection of somebody else's bank account: enough for a
/// transfer-destination lookup, nothing about the balance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RedactedBankAccount {
    pub id: i64,
    pub iban: String,
    pub user: UserRef,
}

/// Per-role projection of a bank account.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum AccountView {
    Full(BankAccount),
    Redacted(RedactedBankAccount),
}

/// Project an account for the given actor. Bankers and admins see every
/// account in full; a client sees own accounts in full and everybody
/// else's redacted.
pub fn account_view(actor: &Actor, account: &BankAccount, owner_username: &str) -> AccountView {
    if actor.caps.admin || actor.caps.banker || actor.owns(account.user_id) {
        AccountView::Full(account.clone())
    } else {
        AccountView::Redacted(RedactedBankAccount {
            id: account.id,
            iban: account.iban.clone(),
            user: UserRef {
                id: account.user_id,
                username: owner_username.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;

    const ADMIN: RoleCaps = RoleCaps { admin: true, banker: false, client: false };
    const BANKER: RoleCaps = RoleCaps { admin: false, banker: true, client: false };
    const CLIENT: RoleCaps = RoleCaps { admin: false, banker: false, client: true };

    fn actor(user_id: i64, caps: RoleCaps) -> Actor {
        Actor::new(user_id, caps)
    }

    fn account(owner: i64) -> BankAccount {
        BankAccount {
            id: 7,
            account_number: "1234567890".to_string(),
            iban: "AL47ABCD00000000000000000000".to_string(),
            currency_id: 1,
            balance: Decimal::new(10_000, 2),
            user_id: owner,
            application_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_manages_bankers_only() {
        let admin = actor(1, ADMIN);
        let banker_user = Target::User { id: 2, is_banker: true, is_client: false };
        let client_user = Target::User { id: 3, is_banker: false, is_client: true };

        assert!(allowed(&admin, Action::Read, &Target::Role));
        assert!(allowed(&admin, Action::Write, &Target::Role));
        assert!(allowed(&admin, Action::Read, &banker_user));
        assert!(allowed(&admin, Action::Write, &banker_user));
        assert!(!allowed(&admin, Action::Read, &client_user));
        assert!(!allowed(&admin, Action::Write, &client_user));
        assert!(!allowed(&admin, Action::Decide, &Target::Application { owner: 3 }));
    }

    #[test]
    fn test_banker_manages_clients_and_decides() {
        let banker = actor(2, BANKER);
        let banker_user = Target::User { id: 5, is_banker: true, is_client: false };
        let client_user = Target::User { id: 3, is_banker: false, is_client: true };

        assert!(!allowed(&banker, Action::Read, &Target::Role));
        assert!(allowed(&banker, Action::Read, &client_user));
        assert!(allowed(&banker, Action::Write, &client_user));
        assert!(!allowed(&banker, Action::Write, &banker_user));

        // Read-only across money entities.
        assert!(allowed(&banker, Action::Read, &Target::BankAccount { owner: 3 }));
        assert!(!allowed(&banker, Action::Write, &Target::BankAccount { owner: 3 }));
        assert!(allowed(&banker, Action::Read, &Target::Card { owner: 3 }));
        assert!(!allowed(&banker, Action::Write, &Target::Card { owner: 3 }));
        assert!(allowed(&banker, Action::Read, &Target::Transaction { account_owner: 3 }));
        assert!(!allowed(&banker, Action::Write, &Target::Transaction { account_owner: 3 }));

        assert!(allowed(&banker, Action::Read, &Target::Application { owner: 3 }));
        assert!(!allowed(&banker, Action::Write, &Target::Application { owner: 3 }));
        assert!(allowed(&banker, Action::Decide, &Target::Application { owner: 3 }));
    }

    #[test]
    fn test_client_owns_only_their_records() {
        let client = actor(3, CLIENT);
        let own_user = Target::User { id: 3, is_banker: false, is_client: true };
        let other_user = Target::User { id: 4, is_banker: false, is_client: true };

        assert!(allowed(&client, Action::Read, &own_user));
        assert!(allowed(&client, Action::Write, &own_user));
        assert!(!allowed(&client, Action::Read, &other_user));
        assert!(!allowed(&client, Action::Read, &Target::Role));

        assert!(allowed(&client, Action::Write, &Target::BankAccount { owner: 3 }));
        assert!(!allowed(&client, Action::Write, &Target::BankAccount { owner: 4 }));
        assert!(allowed(&client, Action::Read, &Target::Card { owner: 3 }));
        assert!(!allowed(&client, Action::Read, &Target::Card { owner: 4 }));
        assert!(allowed(&client, Action::Read, &Target::Transaction { account_owner: 3 }));
        assert!(!allowed(&client, Action::Read, &Target::Transaction { account_owner: 4 }));

        assert!(allowed(&client, Action::Write, &Target::Application { owner: 3 }));
        assert!(!allowed(&client, Action::Write, &Target::Application { owner: 4 }));
        assert!(!allowed(&client, Action::Decide, &Target::Application { owner: 3 }));
    }

    #[test]
    fn test_client_may_read_foreign_account_for_transfer_lookup() {
        let client = actor(3, CLIENT);
        assert!(allowed(&client, Action::Read, &Target::BankAccount { owner: 4 }));
    }

    #[test]
    fn test_account_view_redaction() {
        let own = actor(3, CLIENT);
        let other = actor(4, CLIENT);
        let banker = actor(2, BANKER);
        let acc = account(3);

        assert!(matches!(account_view(&own, &acc, "alice"), AccountView::Full(_)));
        assert!(matches!(account_view(&banker, &acc, "alice"), AccountView::Full(_)));

        match account_view(&other, &acc, "alice") {
            AccountView::Redacted(view) => {
                assert_eq!(view.id, acc.id);
                assert_eq!(view.iban, acc.iban);
                assert_eq!(view.user.id, 3);
                assert_eq!(view.user.username, "alice");
            }
            AccountView::Full(_) => panic!("expected redacted view"),
        }
    }

    #[test]
    fn test_no_capability_bits_denies_everything() {
        let nobody = actor(9, RoleCaps { admin: false, banker: false, client: false });
        for action in [Action::Read, Action::Write, Action::Decide] {
            assert!(!allowed(&nobody, action, &Target::Role));
            assert!(!allowed(&nobody, action, &Target::User { id: 9, is_banker: false, is_client: true }));
            assert!(!allowed(&nobody, action, &Target::BankAccount { owner: 9 }));
            assert!(!allowed(&nobody, action, &Target::Card { owner: 9 }));
            assert!(!allowed(&nobody, action, &Target::Transaction { account_owner: 9 }));
            assert!(!allowed(&nobody, action, &Target::Application { owner: 9 }));
        }
    }
}
