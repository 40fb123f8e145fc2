//! Refresh token ledger rows and blacklist entries.
//!
//! A [`RefreshTokenRecord`] is the authority on refresh token validity: the
//! signed refresh token only carries its `jti`. A [`BlacklistEntry`] stores a
//! one-way hash of an access token (never the token itself) and stops
//! mattering once `expires_at` has passed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Opaque client metadata captured at login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
}

impl DeviceInfo {
    pub fn is_empty(&self) -> bool {
        self.user_agent.is_none() && self.ip.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub jti: String,
    pub user_id: Uuid,
    pub device_info: Option<DeviceInfo>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub is_revoked: bool,
}

impl RefreshTokenRecord {
    /// Valid iff not revoked and not yet expired at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum BlacklistReason {
    Logout,
    ForcedLogout,
    SecurityBreach,
}

impl BlacklistReason {
    pub fn as_str(self) -> &'static str {
        match self {
            BlacklistReason::Logout => "logout",
            BlacklistReason::ForcedLogout => "forced_logout",
            BlacklistReason::SecurityBreach => "security_breach",
        }
    }
}

impl fmt::Display for BlacklistReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlacklistReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "logout" => Ok(BlacklistReason::Logout),
            "forced_logout" => Ok(BlacklistReason::ForcedLogout),
            "security_breach" => Ok(BlacklistReason::SecurityBreach),
            other => Err(format!("unknown blacklist reason: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub jti: String,
    pub token_hash: String,
    pub user_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
    pub reason: BlacklistReason,
}

impl BlacklistEntry {
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Counts over the refresh token ledger. Revoked rows that have also
/// expired are counted in both `revoked_tokens` and `expired_tokens`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RefreshTokenStats {
    pub total_tokens: i64,
    pub active_tokens: i64,
    pub revoked_tokens: i64,
    pub expired_tokens: i64,
    pub unique_users: i64,
}

/// Counts over the blacklist ledger, user-wide markers included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BlacklistStats {
    pub total_blacklisted: i64,
    pub active_blacklisted: i64,
    pub logout_count: i64,
    pub forced_logout_count: i64,
    pub security_breach_count: i64,
}
