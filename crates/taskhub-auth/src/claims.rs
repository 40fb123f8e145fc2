//! JWT claim structures.
//!
//! Access and refresh tokens share one claim layout and are told apart by the
//! `type` claim. Access tokens carry the role so downstream services can make
//! coarse decisions without a lookup; refresh tokens carry the ledger `jti`.

use serde::{Deserialize, Serialize};
use taskhub_core::{AuthError, Role};
use taskhub_models::TokenInfo;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Claims embedded in every token this service signs.
///
/// `token_type` is kept as a plain string so a token with an unknown type still
/// decodes and is rejected as the wrong type rather than as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    pub email: String,
    /// Present on access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Ledger identifier on refresh tokens, a random nonce on access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    #[serde(rename = "type")]
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn is_type(&self, token_type: TokenType) -> bool {
        self.token_type == token_type.as_str()
    }

    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenMalformed)
    }

    pub fn token_info(&self) -> Result<TokenInfo, AuthError> {
        Ok(TokenInfo {
            sub: self.user_id()?,
            email: self.email.clone(),
            role: self.role,
            iat: self.iat,
            exp: self.exp,
        })
    }
}
