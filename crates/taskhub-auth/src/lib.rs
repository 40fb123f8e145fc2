//! # taskhub Auth
//!
//! Token issuance, session ledgers, and authorization for the taskhub API.
//!
//! - [`claims`]: JWT claim layout shared by access and refresh tokens
//! - [`jwt`]: the [`TokenSigner`]
//! - [`store`]: credential store and ledger traits, token hashing helpers
//! - [`session`]: the [`SessionManager`] driving login, authentication,
//!   refresh, logout, and forced logout
//! - [`gate`]: role-based authorization
//!
//! With the `test-utils` feature, [`memory`] provides in-memory stores.
//!
//! # Example
//!
//! ```ignore
//! use taskhub_auth::{SessionManager, authorize};
//! use taskhub_core::Role;
//!
//! let outcome = sessions.login("user@example.com", "password123", None).await?;
//! let context = sessions.authenticate(Some(&outcome.tokens.access_token)).await?;
//! authorize(Some(&context), &[Role::Manager, Role::Admin])?;
//! ```

pub mod claims;
pub mod gate;
pub mod jwt;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod session;
pub mod store;

// Re-export commonly used types at crate root
pub use claims::{Claims, TokenType};
pub use gate::{ADMIN_ONLY, MANAGER_OR_ADMIN, authorize, require_at_least};
pub use jwt::TokenSigner;
pub use session::{AuthContext, LoginOutcome, SessionManager, SessionStores};
pub use store::{BlacklistLedger, CredentialStore, RefreshTokenLedger, hash_token};
