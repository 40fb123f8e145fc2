//! PostgreSQL connection settings.
//!
//! - `DATABASE_URL`: connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
//! - `DATABASE_ACQUIRE_TIMEOUT_MS`: how long a caller may wait for a pooled
//!   connection before the store call fails (default: 3000)

use std::env;
use std::time::Duration;

use crate::parse_env;

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            url: env::var("DATABASE_URL")?,
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            acquire_timeout: parse_env("DATABASE_ACQUIRE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(3000)),
        })
    }
}
