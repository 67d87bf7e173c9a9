//! Core error taxonomy and HTTP mapping.
//!
//! Validation and business-rule failures are user-visible 400-class errors
//! with their original message. Unexpected persistence failures are logged
//! and surfaced as a generic 500 so internals never leak to the client.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Missing or malformed request field.
    #[error("{0}")]
    Validation(String),

    /// Business rule rejected the operation (insufficient funds, currency
    /// mismatch, no linked card, invalid action, ...).
    #[error("{0}")]
    BusinessRule(String),

    /// Entity is already in a terminal state.
    #[error("{0}")]
    Conflict(String),

    /// Unknown entity id.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Actor's role does not permit the action.
    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected persistence failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Any other unexpected failure.
    #[error("{0}")]
    Internal(String),
}

impl CoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) | CoreError::BusinessRule(_) | CoreError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Unauthorized(_) => StatusCode::FORBIDDEN,
            CoreError::Database(_) | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
            "An error occurred".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            CoreError::Validation("amount is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CoreError::BusinessRule("Insufficient funds".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CoreError::Conflict("Application already processed".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CoreError::NotFound("application").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CoreError::Unauthorized("Banker permission required".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            CoreError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_facing_messages_kept_verbatim() {
        let err = CoreError::BusinessRule("Bank accounts have different currency types".into());
        assert_eq!(err.to_string(), "Bank accounts have different currency types");

        let err = CoreError::NotFound("application");
        assert_eq!(err.to_string(), "application not found");
    }
}
