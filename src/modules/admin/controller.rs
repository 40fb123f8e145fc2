use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use taskhub_core::AppError;
use taskhub_models::{
    BlacklistReason, CleanupResponse, ForcedLogoutRequest, ForcedLogoutResponse,
    SessionStatsResponse,
};
use tracing::instrument;
use uuid::Uuid;

use crate::middleware::role::RequireAdmin;
use crate::state::AppState;
use crate::validator::optional_json;

/// Revoke every session of a user
///
/// Revokes all refresh tokens of the user and invalidates every access token
/// issued to them so far. The reason defaults to `forced_logout`.
#[utoipa::path(
    post,
    path = "/api/admin/users/{user_id}/revoke",
    params(
        ("user_id" = Uuid, Path, description = "User whose sessions are revoked")
    ),
    request_body(content = ForcedLogoutRequest, description = "Optional revocation reason"),
    responses(
        (status = 200, description = "Sessions revoked", body = ForcedLogoutResponse),
        (status = 400, description = "Invalid reason", body = crate::modules::auth::controller::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::modules::auth::controller::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::modules::auth::controller::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(admin_id = %admin.user_id(), %user_id))]
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(user_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<ForcedLogoutResponse>, AppError> {
    let dto: ForcedLogoutRequest = optional_json(&body)?;

    let reason = match dto.reason.unwrap_or(BlacklistReason::ForcedLogout) {
        BlacklistReason::Logout => {
            return Err(AppError::bad_request(
                "reason must be forced_logout or security_breach",
            ));
        }
        reason => reason,
    };

    let revoked_refresh_tokens = state.sessions.force_logout(user_id, reason).await?;

    Ok(Json(ForcedLogoutResponse {
        user_id,
        revoked_refresh_tokens,
    }))
}

/// Delete expired ledger records
#[utoipa::path(
    post,
    path = "/api/admin/cleanup",
    responses(
        (status = 200, description = "Expired records removed", body = CleanupResponse),
        (status = 401, description = "Unauthorized", body = crate::modules::auth::controller::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::modules::auth::controller::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn cleanup_sessions(
    State(state): State<AppState>,
) -> Result<Json<CleanupResponse>, AppError> {
    let removed = state.sessions.cleanup_expired().await?;
    Ok(Json(removed))
}

/// Refresh token and blacklist statistics
#[utoipa::path(
    get,
    path = "/api/admin/sessions/stats",
    responses(
        (status = 200, description = "Ledger statistics", body = SessionStatsResponse),
        (status = 401, description = "Unauthorized", body = crate::modules::auth::controller::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::modules::auth::controller::ErrorResponse),
        (status = 503, description = "Ledger unavailable", body = crate::modules::auth::controller::ErrorResponse)
    ),
    tag = "Admin",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn get_session_stats(
    State(state): State<AppState>,
) -> Result<Json<SessionStatsResponse>, AppError> {
    let stats = state.sessions.stats().await?;
    Ok(Json(stats))
}
