use taskhub_core::Role;
use taskhub_models::{
    AuthTokens, BlacklistReason, BlacklistStats, CleanupResponse, DeviceInfo, ForcedLogoutRequest,
    ForcedLogoutResponse, LoginRequest, LoginResponse, LogoutRequest, MessageResponse,
    RefreshResponse, RefreshTokenRecord, RefreshTokenRequest, RefreshTokenStats, RegisterRequest,
    SessionStatsResponse, SessionsResponse, TokenInfo, UserEnvelope, UserResponse, UserStatus,
    VerifyTokenRequest, VerifyTokenResponse,
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::auth::controller::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::auth::controller::register_user,
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::refresh_token,
        crate::modules::auth::controller::logout,
        crate::modules::auth::controller::logout_all,
        crate::modules::auth::controller::get_me,
        crate::modules::auth::controller::verify_token,
        crate::modules::auth::controller::get_sessions,
        crate::modules::admin::controller::revoke_user_sessions,
        crate::modules::admin::controller::cleanup_sessions,
        crate::modules::admin::controller::get_session_stats,
    ),
    components(
        schemas(
            Role,
            UserStatus,
            UserResponse,
            UserEnvelope,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            AuthTokens,
            RefreshTokenRequest,
            RefreshResponse,
            LogoutRequest,
            VerifyTokenRequest,
            VerifyTokenResponse,
            TokenInfo,
            DeviceInfo,
            RefreshTokenRecord,
            SessionsResponse,
            BlacklistReason,
            ForcedLogoutRequest,
            ForcedLogoutResponse,
            CleanupResponse,
            RefreshTokenStats,
            BlacklistStats,
            SessionStatsResponse,
            MessageResponse,
            ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login, token refresh, logout, and token verification"),
        (name = "Admin", description = "Administrative session management")
    ),
    info(
        title = "Taskhub API",
        version = "0.1.0",
        description = "Authentication and session core of the taskhub task-management API.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
