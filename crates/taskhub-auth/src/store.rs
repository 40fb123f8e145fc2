//! Storage seams of the session flows.
//!
//! The session manager talks to three stores through these traits:
//!
//! - [`CredentialStore`]: user lookup and creation
//! - [`RefreshTokenLedger`]: the authority on refresh token validity
//! - [`BlacklistLedger`]: hashed access tokens revoked before expiry, plus
//!   user-wide revocation markers written by forced logout
//!
//! The PostgreSQL implementations live in `taskhub-db`; in-memory ones for
//! tests live in [`crate::memory`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use taskhub_core::StoreError;
use taskhub_models::{
    BlacklistReason, BlacklistStats, DeviceInfo, NewUser, RefreshTokenRecord, RefreshTokenStats,
    User,
};
use uuid::Uuid;

/// Prefix of the `token_hash` column for user-wide revocation markers.
pub const USER_REVOCATION_PREFIX: &str = "user:";

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Active users only.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Active users only.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a user. `None` when the email or username is already taken.
    async fn create(&self, user: NewUser) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait RefreshTokenLedger: Send + Sync {
    /// Records a new refresh token with a fresh `jti` expiring after the
    /// ledger's configured lifetime.
    async fn create(
        &self,
        user_id: Uuid,
        device_info: Option<DeviceInfo>,
    ) -> Result<RefreshTokenRecord, StoreError>;

    /// The row for `jti` if it is neither expired nor revoked.
    async fn find_valid(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError>;

    /// Marks the row revoked. Idempotent; `false` only when no row has `jti`.
    async fn revoke(&self, jti: &str) -> Result<bool, StoreError>;

    /// Atomically revokes a valid row and returns it. Of two concurrent
    /// consumers of the same `jti`, at most one gets `Some`.
    async fn consume(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Revokes every unrevoked row of the user, returning how many changed.
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError>;

    /// Valid rows of the user, most recently used first.
    async fn active_for_user(&self, user_id: Uuid)
    -> Result<Vec<RefreshTokenRecord>, StoreError>;

    /// Deletes rows that are expired or revoked.
    async fn cleanup_expired(&self) -> Result<u64, StoreError>;

    async fn stats(&self) -> Result<RefreshTokenStats, StoreError>;
}

#[async_trait]
pub trait BlacklistLedger: Send + Sync {
    /// Blacklists a raw access token by its hash. `false` when an entry for
    /// the same token already exists; never an error for duplicates.
    async fn add(
        &self,
        raw_token: &str,
        user_id: Uuid,
        reason: BlacklistReason,
    ) -> Result<bool, StoreError>;

    /// True iff an unexpired entry matches the token's hash.
    async fn is_blacklisted(&self, raw_token: &str) -> Result<bool, StoreError>;

    /// Writes a user-wide marker: every token of the user issued at or before
    /// the returned instant is treated as revoked until `window` elapses.
    async fn revoke_user(
        &self,
        user_id: Uuid,
        reason: BlacklistReason,
        window: Duration,
    ) -> Result<DateTime<Utc>, StoreError>;

    /// Latest unexpired user-wide marker.
    async fn user_revoked_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, StoreError>;

    /// Deletes entries whose expiry has passed.
    async fn cleanup_expired(&self) -> Result<u64, StoreError>;

    async fn stats(&self) -> Result<BlacklistStats, StoreError>;
}

/// SHA-256 of the raw token, hex encoded.
pub fn hash_token(raw_token: &str) -> String {
    hex::encode(Sha256::digest(raw_token.as_bytes()))
}

/// The `exp` claim of a token, read without verifying the signature.
pub fn token_expiry(raw_token: &str) -> Option<DateTime<Utc>> {
    #[derive(Deserialize)]
    struct Expiry {
        exp: i64,
    }

    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<Expiry>(raw_token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .and_then(|data| DateTime::from_timestamp(data.claims.exp, 0))
}

/// When a blacklist entry for `raw_token` stops mattering: the token's own
/// expiry, or `now + fallback` when that cannot be read.
pub fn blacklist_expiry(raw_token: &str, fallback: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    token_expiry(raw_token).unwrap_or(now + fallback)
}

/// `token_hash` value of a user-wide revocation marker.
pub fn user_revocation_hash(user_id: Uuid, at: DateTime<Utc>) -> String {
    format!("{}{}:{}", USER_REVOCATION_PREFIX, user_id, at.timestamp())
}
