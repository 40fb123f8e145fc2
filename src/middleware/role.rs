//! Role-based authorization middleware for Axum
//!
//! Two ways to gate a route on the `user < manager < admin` hierarchy:
//! 1. Layers built from [`require_admin`] / [`require_manager_or_admin`]
//! 2. Extractors [`RequireAdmin`] / [`RequireManagerOrAdmin`]
//!
//! Both authenticate first, so a missing or invalid token is a 401 and a
//! valid token with too low a role is a 403 listing the required roles.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use taskhub_auth::{ADMIN_ONLY, MANAGER_OR_ADMIN, authorize, require_at_least};
use taskhub_core::{AppError, Role};

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Middleware function that checks if the authenticated user has one of the
/// allowed roles.
///
/// # Usage with axum::middleware::from_fn_with_state
///
/// ```rust,ignore
/// use axum::{Router, middleware};
/// use taskhub_core::Role;
///
/// let protected_routes = Router::new()
///     .route("/reports", get(reports_handler))
///     .layer(middleware::from_fn_with_state(
///         state.clone(),
///         |state, req, next| require_roles(state, req, next, &[Role::Manager, Role::Admin]),
///     ));
/// ```
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: &'static [Role],
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let AuthUser(context) = AuthUser::from_request_parts(&mut parts, &state).await?;
    authorize(Some(&context), allowed_roles)?;

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// Layer for admin-only routes.
///
/// ```rust,ignore
/// let admin_routes = init_admin_router()
///     .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));
/// ```
pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, ADMIN_ONLY).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Layer for routes open to managers and admins.
pub async fn require_manager_or_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    match require_roles(State(state), req, next, MANAGER_OR_ADMIN).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Extractor for admin-only handlers.
///
/// ```rust,ignore
/// pub async fn revoke_sessions(RequireAdmin(admin): RequireAdmin) -> Result<..., AppError> {
///     // Only admins get here
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        authorize(Some(&auth_user.0), ADMIN_ONLY)?;
        Ok(RequireAdmin(auth_user))
    }
}

/// Extractor for manager-or-admin handlers.
#[derive(Debug, Clone)]
pub struct RequireManagerOrAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireManagerOrAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        authorize(Some(&auth_user.0), MANAGER_OR_ADMIN)?;
        Ok(RequireManagerOrAdmin(auth_user))
    }
}

/// Checks the user against an explicit role list.
pub fn check_any_role(auth_user: &AuthUser, allowed_roles: &[Role]) -> Result<(), AppError> {
    authorize(Some(&auth_user.0), allowed_roles)?;
    Ok(())
}

/// Checks that the user ranks at or above `minimum`.
pub fn check_role_hierarchy(auth_user: &AuthUser, minimum: Role) -> Result<(), AppError> {
    require_at_least(Some(&auth_user.0), minimum)?;
    Ok(())
}
