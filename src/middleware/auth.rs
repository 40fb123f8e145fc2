use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use taskhub_auth::AuthContext;
use taskhub_core::{AppError, Role};
use taskhub_models::{DeviceInfo, User};
use uuid::Uuid;

use crate::state::AppState;

/// Token from the `Authorization` header.
///
/// Accepts `Bearer <token>` as well as a bare token. Absent, non-ASCII, or
/// blank headers yield `None`.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match (value.get(..6), value.get(6..)) {
        (Some(scheme), Some(rest))
            if scheme.eq_ignore_ascii_case("bearer")
                && rest.chars().next().is_none_or(char::is_whitespace) =>
        {
            rest.trim()
        }
        _ => value,
    };
    (!token.is_empty()).then_some(token)
}

/// Extractor that runs the full authentication flow and provides the
/// authenticated user.
///
/// The resulting context is cached in the request extensions, so role layers
/// and handlers on the same request authenticate only once.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthContext);

impl AuthUser {
    pub fn user(&self) -> &User {
        &self.0.user
    }

    pub fn user_id(&self) -> Uuid {
        self.0.user.id
    }

    pub fn role(&self) -> Role {
        self.0.user.role
    }

    pub fn email(&self) -> &str {
        &self.0.user.email
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(AuthUser(context.clone()));
        }

        let context = state
            .sessions
            .authenticate(extract_token(&parts.headers))
            .await?;

        parts.extensions.insert(context.clone());
        Ok(AuthUser(context))
    }
}

/// Like [`AuthUser`] but never rejects: any authentication failure yields
/// `OptionalAuthUser(None)`.
#[derive(Debug, Clone)]
pub struct OptionalAuthUser(pub Option<AuthContext>);

impl FromRequestParts<AppState> for OptionalAuthUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(context) = parts.extensions.get::<AuthContext>() {
            return Ok(OptionalAuthUser(Some(context.clone())));
        }

        let context = state
            .sessions
            .authenticate_optional(extract_token(&parts.headers))
            .await;

        if let Some(context) = &context {
            parts.extensions.insert(context.clone());
        }
        Ok(OptionalAuthUser(context))
    }
}

/// Client metadata recorded on refresh token ledger rows.
///
/// The IP is the first `X-Forwarded-For` hop when present, otherwise the
/// peer address.
#[derive(Debug, Clone, Default)]
pub struct ClientDevice(pub DeviceInfo);

impl ClientDevice {
    pub fn into_inner(self) -> Option<DeviceInfo> {
        (!self.0.is_empty()).then_some(self.0)
    }
}

impl<S> FromRequestParts<S> for ClientDevice
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(str::to_string);

        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });

        Ok(ClientDevice(DeviceInfo { user_agent, ip }))
    }
}
