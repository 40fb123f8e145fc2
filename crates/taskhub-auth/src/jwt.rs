//! JWT (JSON Web Token) signing and verification.
//!
//! [`TokenSigner`] mints and verifies the two token kinds used by the session
//! flows:
//!
//! - **Access tokens**: short-lived, carry `id`, `email`, and `role`
//! - **Refresh tokens**: long-lived, carry the ledger `jti`
//!
//! Every token is HS256-signed and bound to the configured issuer and
//! audience. Verification pins the algorithm, so tokens declaring any other
//! `alg` (including `none`) are rejected.
//!
//! # Example
//!
//! ```ignore
//! use taskhub_auth::TokenSigner;
//! use taskhub_config::JwtConfig;
//!
//! let signer = TokenSigner::new(&JwtConfig::from_env());
//!
//! let token = signer.issue_access(&user)?;
//! let claims = signer.verify(&token)?;
//! assert_eq!(claims.sub, user.id.to_string());
//! ```

use std::fmt;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use taskhub_config::JwtConfig;
use taskhub_core::{AuthError, Role};
use taskhub_models::User;
use uuid::Uuid;

use crate::claims::{Claims, TokenType};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Mints and verifies signed tokens with a fixed secret, issuer, and audience.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: i64,
    refresh_ttl: i64,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(jwt_config: &JwtConfig) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[jwt_config.issuer.as_str()]);
        validation.set_audience(&[jwt_config.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);
        validation.leeway = jwt_config.leeway;

        Self {
            encoding_key: EncodingKey::from_secret(jwt_config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_config.secret.as_bytes()),
            validation,
            issuer: jwt_config.issuer.clone(),
            audience: jwt_config.audience.clone(),
            access_ttl: jwt_config.access_token_expiry,
            refresh_ttl: jwt_config.refresh_token_expiry,
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl(&self) -> i64 {
        self.refresh_ttl
    }

    /// Creates a short-lived access token for `user`.
    ///
    /// A random `jti` makes every access token distinct, so blacklisting one
    /// session's token never affects a token minted in the same second.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if encoding fails.
    pub fn issue_access(&self, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = self.claims(
            user,
            TokenType::Access,
            Some(user.role),
            Uuid::new_v4().to_string(),
            now,
            now + self.access_ttl,
        );
        self.sign(&claims)
    }

    /// Creates a long-lived refresh token bound to the ledger row `jti`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Internal`] if encoding fails.
    pub fn issue_refresh(&self, jti: &str, user: &User) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = self.claims(
            user,
            TokenType::Refresh,
            None,
            jti.to_string(),
            now,
            now + self.refresh_ttl,
        );
        self.sign(&claims)
    }

    /// Verifies signature, algorithm, issuer, audience, and expiry.
    ///
    /// The token type is not checked here; callers decide which type they
    /// accept.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] if `exp` has passed
    /// - [`AuthError::TokenMalformed`] for every other failure
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenMalformed,
            })
    }

    fn claims(
        &self,
        user: &User,
        token_type: TokenType,
        role: Option<Role>,
        jti: String,
        iat: i64,
        exp: i64,
    ) -> Claims {
        Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role,
            jti: Some(jti),
            token_type: token_type.as_str().to_string(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        }
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(format!("Failed to create token: {}", e)))
    }
}
