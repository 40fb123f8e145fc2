use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use taskhub_auth::{ADMIN_ONLY, authorize};
use taskhub_core::{AppError, Role, normalize_role};
use taskhub_models::{
    LoginRequest, LoginResponse, LogoutRequest, MessageResponse, RefreshResponse,
    RefreshTokenRequest, RegisterRequest, SessionsResponse, UserEnvelope, VerifyTokenRequest,
    VerifyTokenResponse,
};
use tracing::instrument;
use utoipa::ToSchema;

use crate::middleware::auth::{AuthUser, ClientDevice, OptionalAuthUser, extract_token};
use crate::state::AppState;
use crate::validator::{ValidatedJson, optional_json};

#[derive(ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable error code, e.g. `TOKEN_EXPIRED`
    pub code: String,
}

/// Register a new user
///
/// Self-registration always creates a `user`. Any other role requires an
/// authenticated admin caller.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = UserEnvelope),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 401, description = "Elevated role requested without authentication", body = ErrorResponse),
        (status = 403, description = "Elevated role requested by a non-admin", body = ErrorResponse),
        (status = 409, description = "Email or username already taken", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all, fields(email = %dto.email))]
pub async fn register_user(
    State(state): State<AppState>,
    OptionalAuthUser(caller): OptionalAuthUser,
    ValidatedJson(dto): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>), AppError> {
    let role = dto.role.as_ref().map(normalize_role).unwrap_or(Role::User);
    if role != Role::User {
        authorize(caller.as_ref(), ADMIN_ONLY)?;
    }

    let user = state.sessions.register(&dto, role, false).await?;
    Ok((StatusCode::CREATED, Json(UserEnvelope { user: user.into() })))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Email not verified", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 503, description = "Session store unavailable", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all, fields(email = %dto.email))]
pub async fn login_user(
    State(state): State<AppState>,
    device: ClientDevice,
    ValidatedJson(dto): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let outcome = state
        .sessions
        .login(&dto.email, &dto.password, device.into_inner())
        .await?;

    Ok(Json(LoginResponse {
        user: outcome.user.into(),
        tokens: outcome.tokens,
    }))
}

/// Exchange a refresh token for a new access token
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token issued", body = RefreshResponse),
        (status = 401, description = "Refresh token invalid, expired, or revoked", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn refresh_token(
    State(state): State<AppState>,
    device: ClientDevice,
    ValidatedJson(dto): ValidatedJson<RefreshTokenRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    let response = state
        .sessions
        .refresh(&dto.refresh_token, device.into_inner())
        .await?;
    Ok(Json(response))
}

/// Logout the current session
///
/// Blacklists the presented access token. A refresh token in the body is
/// revoked as well when it belongs to the same user.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    request_body(content = LogoutRequest, description = "Optional refresh token to revoke"),
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth_user.user_id()))]
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
    body: Bytes,
) -> Result<Json<MessageResponse>, AppError> {
    let dto: LogoutRequest = optional_json(&body)?;

    state
        .sessions
        .logout(&auth_user.0, dto.refresh_token.as_deref())
        .await?;

    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Logout every session of the current user
#[utoipa::path(
    post,
    path = "/api/auth/logout-all",
    responses(
        (status = 200, description = "All sessions ended", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth_user.user_id()))]
pub async fn logout_all(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    let revoked = state.sessions.logout_all(&auth_user.0).await?;

    Ok(Json(MessageResponse {
        message: format!("Logged out of {} session(s)", revoked),
    }))
}

/// Get the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserEnvelope),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all)]
pub async fn get_me(auth_user: AuthUser) -> Json<UserEnvelope> {
    Json(UserEnvelope {
        user: auth_user.user().into(),
    })
}

/// Verify an access token
///
/// The token is read from the `Authorization` header, or from the JSON body
/// when the header is absent.
#[utoipa::path(
    post,
    path = "/api/auth/verify",
    request_body(content = VerifyTokenRequest, description = "Token to verify when no Authorization header is sent"),
    responses(
        (status = 200, description = "Token is valid", body = VerifyTokenResponse),
        (status = 401, description = "Token missing, invalid, expired, or revoked", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn verify_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<VerifyTokenResponse>, AppError> {
    let token = match extract_token(&headers) {
        Some(token) => Some(token.to_string()),
        None => optional_json::<VerifyTokenRequest>(&body)?.token,
    };
    let token = token.as_deref().map(str::trim).filter(|token| !token.is_empty());

    let context = state.sessions.authenticate(token).await?;
    let token_info = context.claims.token_info()?;

    Ok(Json(VerifyTokenResponse {
        user: context.user.into(),
        token_info,
    }))
}

/// List active sessions of the authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/sessions",
    responses(
        (status = 200, description = "Active refresh token sessions, most recently used first", body = SessionsResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth_user.user_id()))]
pub async fn get_sessions(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<SessionsResponse>, AppError> {
    let sessions = state.sessions.active_sessions(auth_user.user_id()).await?;
    Ok(Json(SessionsResponse { sessions }))
}
