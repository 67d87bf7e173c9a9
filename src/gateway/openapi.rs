//! OpenAPI / Swagger UI documentation.
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::models::{BankAccount, Card, Transaction, User};
use crate::policy::{AccountView, RedactedBankAccount, UserRef};
use crate::user_auth::{AuthResponse, LoginRequest};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bank Back-Office API",
        version = "1.0.0",
        description = "Role-based banking back office: accounts, cards, applications and transfers."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::auth::login,
        crate::gateway::handlers::auth::me,
        crate::gateway::handlers::users::list,
        crate::gateway::handlers::accounts::list,
        crate::gateway::handlers::accounts::get,
        crate::gateway::handlers::transactions::list,
        crate::gateway::handlers::applications::decide_bank,
        crate::gateway::handlers::applications::decide_card,
        crate::gateway::handlers::transfer::create,
    ),
    components(schemas(
        User,
        BankAccount,
        Card,
        Transaction,
        AccountView,
        RedactedBankAccount,
        UserRef,
        LoginRequest,
        AuthResponse,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;
