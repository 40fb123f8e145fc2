//! # taskhub Config
//!
//! Configuration types for the taskhub API, each loaded from environment
//! variables with documented defaults:
//!
//! - [`jwt`]: signing secret, issuer/audience binding, token lifetimes
//! - [`session`]: blacklist failure policy, store timeouts, refresh rotation
//! - [`password`]: bcrypt work factor
//! - [`database`]: PostgreSQL connection settings
//! - [`server`]: listen address
//! - [`cors`]: CORS (Cross-Origin Resource Sharing) configuration
//!
//! # Example
//!
//! ```ignore
//! use taskhub_config::{JwtConfig, SessionConfig};
//!
//! let jwt_config = JwtConfig::from_env();
//! let session_config = SessionConfig::from_env(&jwt_config);
//! ```

pub mod cors;
pub mod database;
pub mod jwt;
pub mod password;
pub mod server;
pub mod session;

// Re-export commonly used types at crate root
pub use cors::CorsConfig;
pub use database::DatabaseConfig;
pub use jwt::JwtConfig;
pub use password::PasswordConfig;
pub use server::ServerConfig;
pub use session::SessionConfig;

use std::env;
use std::str::FromStr;

/// Reads and parses an environment variable, `None` when unset or unparseable.
pub(crate) fn parse_env<T: FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Reads a boolean flag accepting `true/false`, `1/0`, `yes/no`, `on/off`.
pub(crate) fn env_flag(key: &str) -> Option<bool> {
    let value = env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
