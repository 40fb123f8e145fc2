use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use taskhub_auth::{SessionManager, SessionStores, TokenSigner};
use taskhub_config::{CorsConfig, DatabaseConfig, JwtConfig, PasswordConfig, SessionConfig};
use taskhub_core::BcryptHasher;
use taskhub_db::{
    PgBlacklistLedger, PgCredentialStore, PgRefreshTokenLedger, init_db_pool, run_migrations,
};

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionManager>,
    pub cors_config: CorsConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("sessions", &self.sessions)
            .field("cors_config", &self.cors_config)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    pub fn new(sessions: SessionManager, cors_config: CorsConfig) -> Self {
        Self {
            sessions: Arc::new(sessions),
            cors_config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: Option<PrometheusHandle>) -> Self {
        self.metrics = handle;
        self
    }
}

/// Wires the PostgreSQL stores into a [`SessionManager`].
pub fn init_session_manager(
    pool: PgPool,
    jwt_config: &JwtConfig,
    session_config: SessionConfig,
    password_config: PasswordConfig,
) -> SessionManager {
    let stores = SessionStores {
        credentials: Arc::new(PgCredentialStore::new(pool.clone())),
        refresh_tokens: Arc::new(PgRefreshTokenLedger::new(
            pool.clone(),
            jwt_config.refresh_token_expiry,
        )),
        blacklist: Arc::new(PgBlacklistLedger::new(
            pool,
            session_config.blacklist_fallback_ttl,
        )),
    };

    SessionManager::new(
        stores,
        TokenSigner::new(jwt_config),
        Arc::new(BcryptHasher::new(password_config.bcrypt_cost)),
        session_config,
    )
}

/// Connects to the database, applies migrations, and builds a session
/// manager from the environment.
pub async fn init_sessions_from_env() -> anyhow::Result<SessionManager> {
    let database_config = DatabaseConfig::from_env().context("DATABASE_URL must be set")?;
    let pool = init_db_pool(&database_config)
        .await
        .context("Failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let jwt_config = JwtConfig::from_env();
    let session_config = SessionConfig::from_env(&jwt_config);

    Ok(init_session_manager(
        pool,
        &jwt_config,
        session_config,
        PasswordConfig::from_env(),
    ))
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let sessions = init_sessions_from_env().await?;
    Ok(AppState::new(sessions, CorsConfig::from_env()))
}
