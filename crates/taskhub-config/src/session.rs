//! Session lifecycle policy.
//!
//! # Environment Variables
//!
//! - `AUTH_BLACKLIST_FAIL_OPEN`: treat a failed blacklist lookup as "not
//!   blacklisted" (default: true). Turning this off rejects every
//!   authenticated request while the blacklist store is unreachable.
//! - `AUTH_STORE_TIMEOUT_MS`: upper bound for a single store call (default: 3000)
//! - `AUTH_BLACKLIST_FALLBACK_SECS`: lifetime of a blacklist entry whose token
//!   expiry cannot be read (default: 86400)
//! - `AUTH_ROTATE_REFRESH_TOKENS`: consume the presented refresh token and
//!   issue a new one on every refresh (default: false)
//! - `AUTH_FORCED_LOGOUT_WINDOW_SECS`: how long a user-wide revocation marker
//!   is kept (default: the refresh token lifetime)
//! - `AUTH_CLEANUP_INTERVAL_SECS`: interval of the ledger cleanup task,
//!   0 disables it (default: 3600)

use std::time::Duration;

use crate::jwt::JwtConfig;
use crate::{env_flag, parse_env};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub blacklist_fail_open: bool,
    pub store_timeout: Duration,
    pub blacklist_fallback_ttl: i64,
    pub rotate_refresh_tokens: bool,
    pub forced_logout_window: i64,
    pub cleanup_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            blacklist_fail_open: true,
            store_timeout: Duration::from_millis(3000),
            blacklist_fallback_ttl: 86400,
            rotate_refresh_tokens: false,
            forced_logout_window: 604800,
            cleanup_interval: Some(Duration::from_secs(3600)),
        }
    }
}

impl SessionConfig {
    pub fn from_env(jwt_config: &JwtConfig) -> Self {
        let defaults = Self::default();
        let cleanup_secs: u64 = parse_env("AUTH_CLEANUP_INTERVAL_SECS").unwrap_or(3600);

        Self {
            blacklist_fail_open: env_flag("AUTH_BLACKLIST_FAIL_OPEN")
                .unwrap_or(defaults.blacklist_fail_open),
            store_timeout: parse_env("AUTH_STORE_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            blacklist_fallback_ttl: parse_env("AUTH_BLACKLIST_FALLBACK_SECS")
                .unwrap_or(defaults.blacklist_fallback_ttl),
            rotate_refresh_tokens: env_flag("AUTH_ROTATE_REFRESH_TOKENS")
                .unwrap_or(defaults.rotate_refresh_tokens),
            forced_logout_window: parse_env("AUTH_FORCED_LOGOUT_WINDOW_SECS")
                .unwrap_or(jwt_config.refresh_token_expiry),
            cleanup_interval: (cleanup_secs > 0).then(|| Duration::from_secs(cleanup_secs)),
        }
    }
}
