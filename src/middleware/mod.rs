//! Middleware and extractors for authentication and authorization.
//!
//! # Modules
//!
//! - [`auth`]: `AuthUser`, `OptionalAuthUser`, and `ClientDevice` extractors
//! - [`role`]: role-gating layers and extractors
//!
//! # Authentication Flow
//!
//! 1. Client sends `Authorization: Bearer <token>` (a bare token also works)
//! 2. `AuthUser` runs the session manager's authentication: blacklist check,
//!    signature and claim verification, token type, forced-logout marker,
//!    and an active-user lookup
//! 3. Role layers or extractors compare the user's role against the route's
//!    allow-list
//! 4. Handler executes if all checks pass
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::AuthUser;
//! use crate::middleware::role::RequireManagerOrAdmin;
//!
//! async fn me(auth_user: AuthUser) -> Json<UserEnvelope> { ... }
//!
//! async fn team_report(RequireManagerOrAdmin(auth_user): RequireManagerOrAdmin) { ... }
//! ```

pub mod auth;
pub mod role;
