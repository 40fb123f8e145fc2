//! # taskhub Core
//!
//! Core types shared by every taskhub crate.
//!
//! - [`errors`]: the authentication error taxonomy, storage errors, and the
//!   HTTP-facing [`AppError`]
//! - [`roles`]: the closed `user < manager < admin` role hierarchy
//! - [`password`]: the password-hashing capability and its bcrypt implementation
//!
//! # Example
//!
//! ```ignore
//! use taskhub_core::{Role, has_permission};
//! use taskhub_core::password::{BcryptHasher, PasswordHasher};
//!
//! assert!(Role::Admin.satisfies(Role::Manager));
//! assert!(!has_permission("user", "superuser"));
//!
//! let hasher = BcryptHasher::new(12);
//! let digest = hasher.hash("correct horse battery staple")?;
//! ```

pub mod errors;
pub mod password;
pub mod roles;

// Re-export commonly used types at crate root
pub use errors::{AppError, AuthError, StoreError};
pub use password::{BcryptHasher, PasswordHasher};
pub use roles::{Role, RoleInput, has_permission, normalize_role, rank_of};
