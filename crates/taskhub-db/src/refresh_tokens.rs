use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use taskhub_auth::RefreshTokenLedger;
use taskhub_core::StoreError;
use taskhub_models::{DeviceInfo, RefreshTokenRecord, RefreshTokenStats};
use tracing::instrument;
use uuid::Uuid;

const RECORD_COLUMNS: &str =
    "id, jti, user_id, device_info, expires_at, created_at, last_used_at, is_revoked";

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    id: Uuid,
    jti: String,
    user_id: Uuid,
    device_info: Option<Json<DeviceInfo>>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    is_revoked: bool,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            id: row.id,
            jti: row.jti,
            user_id: row.user_id,
            device_info: row.device_info.map(|Json(device)| device),
            expires_at: row.expires_at,
            created_at: row.created_at,
            last_used_at: row.last_used_at,
            is_revoked: row.is_revoked,
        }
    }
}

/// Refresh token ledger over the `refresh_tokens` table.
#[derive(Debug, Clone)]
pub struct PgRefreshTokenLedger {
    pool: PgPool,
    ttl: Duration,
}

impl PgRefreshTokenLedger {
    /// `ttl_seconds` must match the refresh token lifetime the signer uses.
    pub fn new(pool: PgPool, ttl_seconds: i64) -> Self {
        Self {
            pool,
            ttl: Duration::seconds(ttl_seconds),
        }
    }
}

#[async_trait]
impl RefreshTokenLedger for PgRefreshTokenLedger {
    #[instrument(skip(self, device_info))]
    async fn create(
        &self,
        user_id: Uuid,
        device_info: Option<DeviceInfo>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        let jti = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + self.ttl;

        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            r#"INSERT INTO refresh_tokens (jti, user_id, device_info, expires_at)
               VALUES ($1, $2, $3, $4)
               RETURNING {}"#,
            RECORD_COLUMNS
        ))
        .bind(&jti)
        .bind(user_id)
        .bind(device_info.filter(|d| !d.is_empty()).map(Json))
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.into())
    }

    #[instrument(skip(self, jti))]
    async fn find_valid(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            r#"SELECT {} FROM refresh_tokens
               WHERE jti = $1 AND expires_at > NOW() AND is_revoked = FALSE"#,
            RECORD_COLUMNS
        ))
        .bind(jti)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE refresh_tokens SET last_used_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }

    #[instrument(skip(self, jti))]
    async fn revoke(&self, jti: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE refresh_tokens SET is_revoked = TRUE WHERE jti = $1")
            .bind(jti)
            .execute(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, jti))]
    async fn consume(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        // Single conditional UPDATE: concurrent consumers race on the row lock
        // and only the first sees is_revoked = FALSE.
        let row = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            r#"UPDATE refresh_tokens
               SET is_revoked = TRUE, last_used_at = NOW()
               WHERE jti = $1 AND expires_at > NOW() AND is_revoked = FALSE
               RETURNING {}"#,
            RECORD_COLUMNS
        ))
        .bind(jti)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET is_revoked = TRUE WHERE user_id = $1 AND is_revoked = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn active_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        let rows = sqlx::query_as::<_, RefreshTokenRow>(&format!(
            r#"SELECT {} FROM refresh_tokens
               WHERE user_id = $1 AND expires_at > NOW() AND is_revoked = FALSE
               ORDER BY last_used_at DESC"#,
            RECORD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::backend)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn cleanup_expired(&self) -> Result<u64, StoreError> {
        let result =
            sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW() OR is_revoked = TRUE")
                .execute(&self.pool)
                .await
                .map_err(StoreError::backend)?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<RefreshTokenStats, StoreError> {
        let (total_tokens, active_tokens, revoked_tokens, expired_tokens, unique_users) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64)>(
                r#"SELECT
                       COUNT(*),
                       COUNT(*) FILTER (WHERE expires_at > NOW() AND is_revoked = FALSE),
                       COUNT(*) FILTER (WHERE is_revoked = TRUE),
                       COUNT(*) FILTER (WHERE expires_at <= NOW()),
                       COUNT(DISTINCT user_id)
                   FROM refresh_tokens"#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::backend)?;

        Ok(RefreshTokenStats {
            total_tokens,
            active_tokens,
            revoked_tokens,
            expired_tokens,
            unique_users,
        })
    }
}
