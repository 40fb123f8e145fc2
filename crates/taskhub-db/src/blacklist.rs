use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use taskhub_auth::BlacklistLedger;
use taskhub_auth::store::{
    USER_REVOCATION_PREFIX, blacklist_expiry, hash_token, user_revocation_hash,
};
use taskhub_core::StoreError;
use taskhub_models::{BlacklistReason, BlacklistStats};
use tracing::instrument;
use uuid::Uuid;

/// Blacklist ledger over the `token_blacklist` table.
///
/// Only SHA-256 hashes of access tokens are stored. User-wide revocation
/// markers share the table and are told apart by their `token_hash` prefix.
#[derive(Debug, Clone)]
pub struct PgBlacklistLedger {
    pool: PgPool,
    fallback_ttl: Duration,
}

impl PgBlacklistLedger {
    /// `fallback_ttl_seconds` bounds entries whose token expiry is unreadable.
    pub fn new(pool: PgPool, fallback_ttl_seconds: i64) -> Self {
        Self {
            pool,
            fallback_ttl: Duration::seconds(fallback_ttl_seconds),
        }
    }

    async fn insert(
        &self,
        token_hash: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
        revoked_at: DateTime<Utc>,
        reason: BlacklistReason,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"INSERT INTO token_blacklist (jti, token_hash, user_id, expires_at, revoked_at, reason)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT DO NOTHING"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at)
        .bind(revoked_at)
        .bind(reason.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl BlacklistLedger for PgBlacklistLedger {
    #[instrument(skip(self, raw_token))]
    async fn add(
        &self,
        raw_token: &str,
        user_id: Uuid,
        reason: BlacklistReason,
    ) -> Result<bool, StoreError> {
        let now = Utc::now();
        let expires_at = blacklist_expiry(raw_token, self.fallback_ttl, now);
        self.insert(&hash_token(raw_token), user_id, expires_at, now, reason)
            .await
    }

    #[instrument(skip_all)]
    async fn is_blacklisted(&self, raw_token: &str) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM token_blacklist WHERE token_hash = $1 AND expires_at > NOW())",
        )
        .bind(hash_token(raw_token))
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    #[instrument(skip(self))]
    async fn revoke_user(
        &self,
        user_id: Uuid,
        reason: BlacklistReason,
        window: Duration,
    ) -> Result<DateTime<Utc>, StoreError> {
        let now = Utc::now();
        self.insert(
            &user_revocation_hash(user_id, now),
            user_id,
            now + window,
            now,
            reason,
        )
        .await?;

        Ok(now)
    }

    #[instrument(skip(self))]
    async fn user_revoked_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, StoreError> {
        sqlx::query_scalar::<_, Option<DateTime<Utc>>>(
            r#"SELECT MAX(revoked_at) FROM token_blacklist
               WHERE user_id = $1 AND token_hash LIKE $2 AND expires_at > NOW()"#,
        )
        .bind(user_id)
        .bind(format!("{}%", USER_REVOCATION_PREFIX))
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)
    }

    #[instrument(skip(self))]
    async fn cleanup_expired(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM token_blacklist WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<BlacklistStats, StoreError> {
        let (
            total_blacklisted,
            active_blacklisted,
            logout_count,
            forced_logout_count,
            security_breach_count,
        ) = sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
            r#"SELECT
                   COUNT(*),
                   COUNT(*) FILTER (WHERE expires_at > NOW()),
                   COUNT(*) FILTER (WHERE reason = 'logout'),
                   COUNT(*) FILTER (WHERE reason = 'forced_logout'),
                   COUNT(*) FILTER (WHERE reason = 'security_breach')
               FROM token_blacklist"#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(BlacklistStats {
            total_blacklisted,
            active_blacklisted,
            logout_count,
            forced_logout_count,
            security_breach_count,
        })
    }
}
