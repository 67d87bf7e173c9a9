//! Session authentication: argon2 password hashing and JWT bearer tokens.
//!
//! The core never sees credentials. Handlers receive an [`Actor`] resolved
//! by the middleware from the token and the user's current role row.
//!
//! [`Actor`]: crate::policy::Actor

pub mod middleware;
pub mod service;

pub use middleware::jwt_auth_middleware;
pub use service::{AuthResponse, Claims, LoginRequest, UserAuthService};
