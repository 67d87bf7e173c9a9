use anyhow::{Context, Result};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use utoipa::ToSchema;

use crate::models::User;
use crate::repository::UserRepository;

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // Subject (user id as string)
    pub exp: usize,  // Expiration time (UTC timestamp)
    pub iat: usize,  // Issued at
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user_id: i64,
    pub username: String,
}

pub struct UserAuthService {
    jwt_secret: String,
}

impl UserAuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Hashing failed: {}", e))?
            .to_string();
        Ok(hash)
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(password_hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Authenticate by username/password and issue a 24h JWT.
    pub async fn login(&self, pool: &PgPool, req: LoginRequest) -> Result<Option<AuthResponse>> {
        let user = UserRepository::get_by_username(pool, &req.username)
            .await
            .context("DB query failed")?;

        let Some(user) = user else {
            return Ok(None);
        };
        if !user.is_active || !self.verify_password(&req.password, &user.password_hash) {
            return Ok(None);
        }

        UserRepository::touch_last_login(pool, user.id)
            .await
            .context("Failed to record login")?;

        let token = self.issue_token(&user)?;
        Ok(Some(AuthResponse {
            token,
            user_id: user.id,
            username: user.username,
        }))
    }

    fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(Duration::hours(24))
            .context("valid timestamp")?
            .timestamp();

        let claims = Claims {
            sub: user.id.to_string(),
            exp: expiration as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .context("Failed to generate token")
    }

    /// Verify JWT token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let decoding_key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn service() -> UserAuthService {
        UserAuthService::new("test-secret".to_string())
    }

    fn user(password_hash: String) -> User {
        User {
            id: 42,
            username: "alice".to_string(),
            password_hash,
            role_id: 3,
            is_active: true,
            is_staff: false,
            last_login: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_password_hash_and_verify() {
        let svc = service();
        let hash = svc.hash_password("password123").unwrap();
        assert_ne!(hash, "password123");
        assert!(svc.verify_password("password123", &hash));
        assert!(!svc.verify_password("wrong", &hash));
        assert!(!svc.verify_password("password123", "not-a-phc-string"));
    }

    #[test]
    fn test_token_roundtrip() {
        let svc = service();
        let token = svc.issue_token(&user("x".to_string())).unwrap();
        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_token_rejected_with_wrong_secret() {
        let token = service().issue_token(&user("x".to_string())).unwrap();
        let other = UserAuthService::new("other-secret".to_string());
        assert!(other.verify_token(&token).is_err());
    }
}
