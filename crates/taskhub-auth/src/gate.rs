//! Role-based authorization.
//!
//! [`authorize`] checks membership in an explicit allow-list; [`require_at_least`]
//! checks position in the `user < manager < admin` hierarchy.

use taskhub_core::{AuthError, Role};

use crate::session::AuthContext;

pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
pub const MANAGER_OR_ADMIN: &[Role] = &[Role::Manager, Role::Admin];

/// Admits `context` iff its user's role is in `allowed`.
///
/// # Errors
///
/// - [`AuthError::AuthRequired`] when the request is unauthenticated
/// - [`AuthError::InsufficientPermissions`] otherwise, carrying both the
///   current role and the allowed set
pub fn authorize<'a>(
    context: Option<&'a AuthContext>,
    allowed: &[Role],
) -> Result<&'a AuthContext, AuthError> {
    let context = context.ok_or(AuthError::AuthRequired)?;
    let current = context.user.role;

    if allowed.contains(&current) {
        Ok(context)
    } else {
        Err(AuthError::InsufficientPermissions {
            current,
            required: allowed.to_vec(),
        })
    }
}

/// Admits `context` iff its user's role ranks at or above `minimum`.
pub fn require_at_least<'a>(
    context: Option<&'a AuthContext>,
    minimum: Role,
) -> Result<&'a AuthContext, AuthError> {
    let allowed: Vec<Role> = Role::ALL
        .into_iter()
        .filter(|role| role.satisfies(minimum))
        .collect();
    authorize(context, &allowed)
}
