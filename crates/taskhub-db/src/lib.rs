//! # taskhub DB
//!
//! PostgreSQL pool initialization, embedded migrations, and the PostgreSQL
//! implementations of the session stores:
//!
//! - [`users`]: [`PgCredentialStore`]
//! - [`refresh_tokens`]: [`PgRefreshTokenLedger`]
//! - [`blacklist`]: [`PgBlacklistLedger`]
//!
//! # Example
//!
//! ```ignore
//! use taskhub_config::DatabaseConfig;
//! use taskhub_db::{init_db_pool, run_migrations};
//!
//! let pool = init_db_pool(&DatabaseConfig::from_env()?).await?;
//! run_migrations(&pool).await?;
//! ```

pub mod blacklist;
pub mod refresh_tokens;
pub mod users;

use sqlx::postgres::PgPoolOptions;
use taskhub_config::DatabaseConfig;
use tracing::info;

pub use blacklist::PgBlacklistLedger;
pub use refresh_tokens::PgRefreshTokenLedger;
pub use users::PgCredentialStore;

// Re-export PgPool for convenience
pub use sqlx::PgPool;

/// Creates a PostgreSQL connection pool.
///
/// The acquire timeout bounds how long a store call waits for a connection,
/// so an exhausted pool surfaces as a store error instead of a hung request.
pub async fn init_db_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "Database pool initialized"
    );
    Ok(pool)
}

/// Runs the embedded migrations under `crates/taskhub-db/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
