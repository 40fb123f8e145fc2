//! JWT signing configuration.
//!
//! # Environment Variables
//!
//! - `JWT_SECRET`: HMAC signing secret
//! - `JWT_ISSUER`: `iss` claim bound into and required on every token
//! - `JWT_AUDIENCE`: `aud` claim bound into and required on every token
//! - `JWT_ACCESS_EXPIRY`: access token lifetime in seconds (default: 900)
//! - `JWT_REFRESH_EXPIRY`: refresh token lifetime in seconds (default: 604800)
//! - `JWT_LEEWAY`: clock-skew tolerance in seconds when checking `exp` (default: 0)

use std::env;

use crate::parse_env;

pub const DEFAULT_ISSUER: &str = "task-management-api";
pub const DEFAULT_AUDIENCE: &str = "task-management-frontend";

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_token_expiry: i64,
    pub refresh_token_expiry: i64,
    pub leeway: u64,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.to_string()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.to_string()),
            access_token_expiry: parse_env("JWT_ACCESS_EXPIRY").unwrap_or(900), // 15 minutes
            refresh_token_expiry: parse_env("JWT_REFRESH_EXPIRY").unwrap_or(604800), // 7 days
            leeway: parse_env("JWT_LEEWAY").unwrap_or(0),
        }
    }
}
