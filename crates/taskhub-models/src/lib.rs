//! # taskhub Models
//!
//! Domain records and request/response DTOs shared by the auth core, the
//! PostgreSQL stores, and the HTTP layer.
//!
//! # Modules
//!
//! - [`users`]: the user identity record and its public projection
//! - [`tokens`]: refresh token ledger rows, blacklist entries, device metadata
//! - [`auth`]: login, registration, refresh, logout, and verification payloads

pub mod auth;
pub mod tokens;
pub mod users;

// Re-export commonly used types at crate root for convenience
pub use auth::{
    AuthTokens, CleanupResponse, ForcedLogoutRequest, ForcedLogoutResponse, LoginRequest,
    LoginResponse, LogoutRequest, MessageResponse, RefreshResponse, RefreshTokenRequest,
    RegisterRequest, SessionStatsResponse, SessionsResponse, TokenInfo, UserEnvelope,
    VerifyTokenRequest, VerifyTokenResponse,
};
pub use tokens::{
    BlacklistEntry, BlacklistReason, BlacklistStats, DeviceInfo, RefreshTokenRecord,
    RefreshTokenStats,
};
pub use users::{NewUser, User, UserResponse, UserStatus};
