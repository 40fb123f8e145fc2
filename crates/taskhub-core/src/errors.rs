//! Error types for the authentication core and its HTTP surface.
//!
//! [`AuthError`] is the taxonomy every session flow reports in. Each variant
//! carries a stable machine-readable code (see [`AuthError::code`]) so clients
//! can branch on it without parsing messages. [`StoreError`] describes ledger
//! and credential-store failures; the session manager decides per call site
//! whether such a failure is fatal or absorbed.
//!
//! [`AppError`] is what handlers return. It renders as
//! `{"error": <message>, "code": <CODE>, ...details}` and never exposes
//! driver errors or internal identifiers.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::roles::Role;

/// Failure of a credential store or ledger operation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation did not complete within the configured store timeout.
    #[error("storage operation timed out")]
    Timeout,
    /// The backend (database driver, pool) reported an error.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Authentication and authorization failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password. Never says which.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email verification required")]
    EmailNotVerified,
    #[error("Access token required")]
    TokenMissing,
    /// Bad signature, wrong algorithm, wrong issuer/audience, or unparseable.
    #[error("Invalid token")]
    TokenMalformed,
    #[error("Token expired")]
    TokenExpired,
    #[error("Invalid token type")]
    InvalidTokenType,
    #[error("Token has been invalidated")]
    TokenBlacklisted,
    /// Collapses "never existed", "expired", and "revoked".
    #[error("Refresh token not found or expired")]
    RefreshTokenNotFoundOrExpired,
    /// The token references a user that is missing, suspended, or deleted.
    #[error("User not found")]
    UserNotFound,
    #[error("User with this email or username already exists")]
    UserExists,
    #[error("Authentication required")]
    AuthRequired,
    #[error("Insufficient permissions")]
    InsufficientPermissions { current: Role, required: Vec<Role> },
    #[error("Service temporarily unavailable")]
    Storage(#[from] StoreError),
    #[error("Internal server error")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::EmailNotVerified => "EMAIL_NOT_VERIFIED",
            Self::TokenMissing => "TOKEN_MISSING",
            Self::TokenMalformed => "TOKEN_INVALID",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::InvalidTokenType => "INVALID_TOKEN_TYPE",
            Self::TokenBlacklisted => "TOKEN_BLACKLISTED",
            Self::RefreshTokenNotFoundOrExpired => "REFRESH_TOKEN_INVALID",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::UserExists => "USER_EXISTS",
            Self::AuthRequired => "AUTH_REQUIRED",
            Self::InsufficientPermissions { .. } => "INSUFFICIENT_PERMISSIONS",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmailNotVerified | Self::InsufficientPermissions { .. } => StatusCode::FORBIDDEN,
            Self::UserExists => StatusCode::CONFLICT,
            Self::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// HTTP-facing error returned by handlers and extractors.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl AppError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Attaches extra top-level fields to the response body.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        if err.status().is_server_error() {
            tracing::error!(error = ?err, code = err.code(), "authentication core failure");
        }

        let app_error = Self::new(err.status(), err.code(), err.to_string());

        match err {
            AuthError::InsufficientPermissions { current, required } => {
                app_error.with_details(json!({
                    "required": required,
                    "current": current,
                }))
            }
            _ => app_error,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(self.message));
        body.insert("code".to_string(), Value::String(self.code.to_string()));

        if let Some(Value::Object(details)) = self.details {
            for (key, value) in details {
                body.entry(key).or_insert(value);
            }
        }

        (self.status, Json(Value::Object(body))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_failures_are_unauthorized() {
        for err in [
            AuthError::TokenMissing,
            AuthError::TokenMalformed,
            AuthError::TokenExpired,
            AuthError::InvalidTokenType,
            AuthError::TokenBlacklisted,
            AuthError::RefreshTokenNotFoundOrExpired,
            AuthError::UserNotFound,
            AuthError::InvalidCredentials,
            AuthError::AuthRequired,
        ] {
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED, "{:?}", err);
        }
    }

    #[test]
    fn test_codes_are_distinct_for_verify_path() {
        let codes = [
            AuthError::TokenMissing.code(),
            AuthError::TokenMalformed.code(),
            AuthError::TokenExpired.code(),
            AuthError::InvalidTokenType.code(),
            AuthError::TokenBlacklisted.code(),
        ];
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_email_not_verified_is_forbidden_and_distinct() {
        let err = AuthError::EmailNotVerified;
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_ne!(err.code(), AuthError::InvalidCredentials.code());
    }

    #[test]
    fn test_storage_error_maps_to_service_unavailable() {
        let err = AuthError::from(StoreError::Timeout);
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), "STORAGE_ERROR");
        assert_eq!(err.to_string(), "Service temporarily unavailable");
    }

    #[test]
    fn test_storage_backend_message_is_not_exposed() {
        let io = std::io::Error::other("connection refused to 10.0.0.5:5432");
        let app_error = AppError::from(AuthError::from(StoreError::backend(io)));
        assert!(!app_error.message.contains("10.0.0.5"));
    }

    #[test]
    fn test_insufficient_permissions_carries_roles() {
        let app_error = AppError::from(AuthError::InsufficientPermissions {
            current: Role::User,
            required: vec![Role::Manager, Role::Admin],
        });
        assert_eq!(app_error.status, StatusCode::FORBIDDEN);
        let details = app_error.details.unwrap();
        assert_eq!(details["current"], "user");
        assert_eq!(details["required"], json!(["manager", "admin"]));
    }

    #[test]
    fn test_app_error_constructors() {
        assert_eq!(AppError::bad_request("x").status, StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::unprocessable("x").status,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::not_found("x").code, "NOT_FOUND");
        assert_eq!(AppError::internal("x").code, "INTERNAL_ERROR");
    }
}
