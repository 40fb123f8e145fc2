//! Session lifecycle: login, authentication, refresh, logout, forced logout.
//!
//! [`SessionManager`] composes the token signer, the password hasher, and the
//! three stores. Every store call is bounded by the configured store timeout;
//! a timeout is reported as [`StoreError::Timeout`].
//!
//! Failure policy per call site:
//!
//! | operation              | store failure                                   |
//! |------------------------|-------------------------------------------------|
//! | login ledger insert    | fatal, no tokens are minted                     |
//! | blacklist lookup       | fail-open or fail-closed per configuration      |
//! | forced-logout marker   | same policy as the blacklist lookup             |
//! | refresh ledger lookup  | fatal                                           |
//! | `last_used_at` update  | logged and ignored                              |
//! | logout blacklist write | fatal                                           |

use std::future::Future;
use std::sync::Arc;

use chrono::Duration;
use taskhub_config::SessionConfig;
use taskhub_core::{AuthError, PasswordHasher, Role, StoreError};
use taskhub_models::{
    AuthTokens, BlacklistReason, CleanupResponse, DeviceInfo, NewUser, RefreshResponse,
    RefreshTokenRecord, RegisterRequest, SessionStatsResponse, User,
};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::claims::{Claims, TokenType};
use crate::jwt::TokenSigner;
use crate::store::{BlacklistLedger, CredentialStore, RefreshTokenLedger};

/// The stores a [`SessionManager`] works against.
#[derive(Clone)]
pub struct SessionStores {
    pub credentials: Arc<dyn CredentialStore>,
    pub refresh_tokens: Arc<dyn RefreshTokenLedger>,
    pub blacklist: Arc<dyn BlacklistLedger>,
}

/// An authenticated request: the active user, the raw access token, and its
/// verified claims.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: User,
    pub token: String,
    pub claims: Claims,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub tokens: AuthTokens,
}

pub struct SessionManager {
    stores: SessionStores,
    signer: TokenSigner,
    hasher: Arc<dyn PasswordHasher>,
    config: SessionConfig,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("signer", &self.signer)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(
        stores: SessionStores,
        signer: TokenSigner,
        hasher: Arc<dyn PasswordHasher>,
        config: SessionConfig,
    ) -> Self {
        Self {
            stores,
            signer,
            hasher,
            config,
        }
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.config.store_timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout)?
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AuthError::Internal(format!("Password hashing task failed: {}", e)))?
    }

    async fn verify_password(&self, password: &str, digest: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let digest = digest.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &digest))
            .await
            .map_err(|e| AuthError::Internal(format!("Password verification task failed: {}", e)))?
    }

    /// Creates a user with a hashed password.
    ///
    /// # Errors
    ///
    /// - [`AuthError::UserExists`] if the email or username is taken
    /// - [`AuthError::Storage`] if the credential store fails
    #[instrument(skip_all, fields(email = %request.email, role = %role))]
    pub async fn register(
        &self,
        request: &RegisterRequest,
        role: Role,
        is_verified: bool,
    ) -> Result<User, AuthError> {
        let password_hash = self.hash_password(&request.password).await?;

        let new_user = NewUser {
            username: request.username.clone(),
            email: request.email.clone(),
            password_hash,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            role,
            is_verified,
        };

        let user = self
            .bounded(self.stores.credentials.create(new_user))
            .await?
            .ok_or(AuthError::UserExists)?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Checks credentials and opens a session.
    ///
    /// The refresh token ledger row is written before any token is minted, so
    /// a ledger failure never hands out a refresh token the ledger does not
    /// know about.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidCredentials`] for an unknown email or a wrong
    ///   password, indistinguishably
    /// - [`AuthError::EmailNotVerified`] for a correct password on an
    ///   unverified account
    /// - [`AuthError::Storage`] if the credential store or the ledger fails
    #[instrument(skip_all, fields(email = %email))]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        device_info: Option<DeviceInfo>,
    ) -> Result<LoginOutcome, AuthError> {
        let user = match self.bounded(self.stores.credentials.find_by_email(email)).await? {
            Some(user) => user,
            None => {
                // Spend the same work as a real password check.
                let _ = self.hash_password(password).await;
                metrics::counter!("auth_login_total", "outcome" => "invalid_credentials")
                    .increment(1);
                debug!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !self.verify_password(password, &user.password_hash).await? {
            metrics::counter!("auth_login_total", "outcome" => "invalid_credentials").increment(1);
            debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_verified {
            metrics::counter!("auth_login_total", "outcome" => "email_not_verified").increment(1);
            return Err(AuthError::EmailNotVerified);
        }

        let tokens = self.open_session(&user, device_info).await?;

        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome { user, tokens })
    }

    async fn open_session(
        &self,
        user: &User,
        device_info: Option<DeviceInfo>,
    ) -> Result<AuthTokens, AuthError> {
        let record = self
            .bounded(self.stores.refresh_tokens.create(user.id, device_info))
            .await?;

        let refresh_token = self.signer.issue_refresh(&record.jti, user)?;
        let access_token = self.signer.issue_access(user)?;

        metrics::counter!("auth_tokens_issued_total", "type" => "refresh").increment(1);
        metrics::counter!("auth_tokens_issued_total", "type" => "access").increment(1);

        Ok(AuthTokens {
            access_token,
            refresh_token,
            expires_in: self.signer.access_ttl(),
        })
    }

    /// Resolves a raw access token to an authenticated request.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenMissing`] if no token was supplied
    /// - [`AuthError::TokenBlacklisted`] if the token was logged out or the
    ///   user was force-logged-out after it was issued
    /// - [`AuthError::TokenExpired`] / [`AuthError::TokenMalformed`] from
    ///   signature verification
    /// - [`AuthError::InvalidTokenType`] for refresh tokens
    /// - [`AuthError::UserNotFound`] if the user is missing or inactive
    /// - [`AuthError::Storage`] if the blacklist fails under the fail-closed
    ///   policy, or the credential store fails
    #[instrument(skip_all)]
    pub async fn authenticate(&self, raw_token: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = raw_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::TokenMissing)?;

        if self.is_blacklisted(token).await? {
            return Err(AuthError::TokenBlacklisted);
        }

        let claims = self.signer.verify(token)?;
        if !claims.is_type(TokenType::Access) {
            return Err(AuthError::InvalidTokenType);
        }

        let user_id = claims.user_id()?;
        if self.revoked_by_forced_logout(user_id, claims.iat).await? {
            return Err(AuthError::TokenBlacklisted);
        }

        let user = self
            .bounded(self.stores.credentials.find_by_id(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(AuthContext {
            user,
            token: token.to_string(),
            claims,
        })
    }

    /// Like [`authenticate`](Self::authenticate) but never fails.
    pub async fn authenticate_optional(&self, raw_token: Option<&str>) -> Option<AuthContext> {
        let token = raw_token?;
        match self.authenticate(Some(token)).await {
            Ok(context) => Some(context),
            Err(err) => {
                debug!(code = err.code(), "Optional authentication skipped");
                None
            }
        }
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool, AuthError> {
        match self.bounded(self.stores.blacklist.is_blacklisted(token)).await {
            Ok(blacklisted) => Ok(blacklisted),
            Err(err) => self.absorb_blacklist_failure(err, "blacklist lookup"),
        }
    }

    async fn revoked_by_forced_logout(&self, user_id: Uuid, issued_at: i64) -> Result<bool, AuthError> {
        match self.bounded(self.stores.blacklist.user_revoked_at(user_id)).await {
            Ok(Some(revoked_at)) => Ok(issued_at <= revoked_at.timestamp()),
            Ok(None) => Ok(false),
            Err(err) => self.absorb_blacklist_failure(err, "forced logout lookup"),
        }
    }

    fn absorb_blacklist_failure(&self, err: StoreError, lookup: &str) -> Result<bool, AuthError> {
        if self.config.blacklist_fail_open {
            metrics::counter!("auth_blacklist_fail_open_total").increment(1);
            warn!(error = %err, lookup, "Blacklist unavailable, treating token as not revoked");
            Ok(false)
        } else {
            Err(AuthError::Storage(err))
        }
    }

    /// Mints a new access token from a refresh token.
    ///
    /// The ledger, not the signature, decides whether the refresh token is
    /// still good. With rotation enabled the presented token is consumed and
    /// a replacement is returned; presenting an already consumed token revokes
    /// every refresh token of the user.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExpired`] / [`AuthError::TokenMalformed`] from
    ///   signature verification
    /// - [`AuthError::InvalidTokenType`] for access tokens
    /// - [`AuthError::RefreshTokenNotFoundOrExpired`] if the ledger has no
    ///   valid row for the token
    /// - [`AuthError::UserNotFound`] if the user is missing or inactive
    /// - [`AuthError::Storage`] if the ledger or credential store fails
    #[instrument(skip_all)]
    pub async fn refresh(
        &self,
        refresh_token: &str,
        device_info: Option<DeviceInfo>,
    ) -> Result<RefreshResponse, AuthError> {
        let result = self.refresh_inner(refresh_token, device_info).await;
        let outcome = match &result {
            Ok(_) => "success",
            Err(err) => err.code(),
        };
        metrics::counter!("auth_refresh_total", "outcome" => outcome).increment(1);
        result
    }

    async fn refresh_inner(
        &self,
        refresh_token: &str,
        device_info: Option<DeviceInfo>,
    ) -> Result<RefreshResponse, AuthError> {
        let claims = self.signer.verify(refresh_token)?;
        if !claims.is_type(TokenType::Refresh) {
            return Err(AuthError::InvalidTokenType);
        }
        let user_id = claims.user_id()?;
        let jti = claims.jti.as_deref().ok_or(AuthError::TokenMalformed)?;

        let record = if self.config.rotate_refresh_tokens {
            self.consume_refresh_token(user_id, jti).await?
        } else {
            let record = self
                .bounded(self.stores.refresh_tokens.find_valid(jti))
                .await?
                .ok_or(AuthError::RefreshTokenNotFoundOrExpired)?;

            if let Err(err) = self
                .bounded(self.stores.refresh_tokens.touch_last_used(record.id))
                .await
            {
                warn!(error = %err, "Failed to update refresh token last use");
            }
            record
        };

        if record.user_id != user_id {
            warn!(%user_id, "Refresh token subject does not match ledger row");
            return Err(AuthError::RefreshTokenNotFoundOrExpired);
        }

        let user = self
            .bounded(self.stores.credentials.find_by_id(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let access_token = self.signer.issue_access(&user)?;
        metrics::counter!("auth_tokens_issued_total", "type" => "access").increment(1);

        let refresh_token = if self.config.rotate_refresh_tokens {
            let device_info = device_info.or(record.device_info);
            let replacement = self
                .bounded(self.stores.refresh_tokens.create(user.id, device_info))
                .await?;
            metrics::counter!("auth_tokens_issued_total", "type" => "refresh").increment(1);
            Some(self.signer.issue_refresh(&replacement.jti, &user)?)
        } else {
            None
        };

        debug!(user_id = %user.id, "Access token refreshed");
        Ok(RefreshResponse {
            access_token,
            refresh_token,
            expires_in: self.signer.access_ttl(),
        })
    }

    async fn consume_refresh_token(
        &self,
        user_id: Uuid,
        jti: &str,
    ) -> Result<RefreshTokenRecord, AuthError> {
        if let Some(record) = self.bounded(self.stores.refresh_tokens.consume(jti)).await? {
            return Ok(record);
        }

        // A validly signed token the ledger no longer honours: either expired
        // or replayed after rotation. Treat as reuse.
        warn!(%user_id, "Refresh token reuse detected, revoking all sessions");
        if let Err(err) = self
            .bounded(self.stores.refresh_tokens.revoke_all_for_user(user_id))
            .await
        {
            warn!(error = %err, %user_id, "Failed to revoke sessions after refresh token reuse");
        }
        Err(AuthError::RefreshTokenNotFoundOrExpired)
    }

    /// Ends the session of `context`.
    ///
    /// The access token is blacklisted. A refresh token submitted alongside is
    /// revoked when it belongs to the same user; anything else about it is
    /// ignored so logout itself still succeeds.
    ///
    /// # Errors
    ///
    /// [`AuthError::Storage`] if the blacklist or ledger write fails.
    #[instrument(skip_all, fields(user_id = %context.user.id))]
    pub async fn logout(
        &self,
        context: &AuthContext,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        self.bounded(self.stores.blacklist.add(
            &context.token,
            context.user.id,
            BlacklistReason::Logout,
        ))
        .await?;

        if let Some(refresh_token) = refresh_token {
            self.revoke_own_refresh_token(context.user.id, refresh_token)
                .await?;
        }

        metrics::counter!("auth_logout_total").increment(1);
        info!("User logged out");
        Ok(())
    }

    async fn revoke_own_refresh_token(
        &self,
        user_id: Uuid,
        refresh_token: &str,
    ) -> Result<(), AuthError> {
        let claims = match self.signer.verify(refresh_token) {
            Ok(claims) if claims.is_type(TokenType::Refresh) => claims,
            _ => {
                debug!("Ignoring unusable refresh token on logout");
                return Ok(());
            }
        };

        match (claims.user_id(), claims.jti.as_deref()) {
            (Ok(owner), Some(jti)) if owner == user_id => {
                self.bounded(self.stores.refresh_tokens.revoke(jti)).await?;
            }
            _ => debug!("Ignoring refresh token of another user on logout"),
        }
        Ok(())
    }

    /// Blacklists the current access token and revokes every refresh token of
    /// the user. Returns the number of refresh tokens revoked.
    #[instrument(skip_all, fields(user_id = %context.user.id))]
    pub async fn logout_all(&self, context: &AuthContext) -> Result<u64, AuthError> {
        self.bounded(self.stores.blacklist.add(
            &context.token,
            context.user.id,
            BlacklistReason::Logout,
        ))
        .await?;

        let revoked = self
            .bounded(self.stores.refresh_tokens.revoke_all_for_user(context.user.id))
            .await?;

        metrics::counter!("auth_logout_total").increment(1);
        info!(revoked, "User logged out of all sessions");
        Ok(revoked)
    }

    /// Revokes every session of a user: all refresh tokens, and every access
    /// token issued up to now through a user-wide marker. Returns the number
    /// of refresh tokens revoked.
    ///
    /// # Errors
    ///
    /// [`AuthError::Storage`] if either ledger fails.
    #[instrument(skip_all, fields(%user_id, %reason))]
    pub async fn force_logout(
        &self,
        user_id: Uuid,
        reason: BlacklistReason,
    ) -> Result<u64, AuthError> {
        let revoked = self
            .bounded(self.stores.refresh_tokens.revoke_all_for_user(user_id))
            .await?;

        let window = Duration::seconds(self.config.forced_logout_window);
        self.bounded(self.stores.blacklist.revoke_user(user_id, reason, window))
            .await?;

        metrics::counter!("auth_forced_logout_total", "reason" => reason.as_str()).increment(1);
        warn!(revoked, "All sessions of user revoked");
        Ok(revoked)
    }

    /// Valid refresh token rows of a user, most recently used first.
    pub async fn active_sessions(&self, user_id: Uuid) -> Result<Vec<RefreshTokenRecord>, AuthError> {
        Ok(self
            .bounded(self.stores.refresh_tokens.active_for_user(user_id))
            .await?)
    }

    /// Deletes expired or revoked refresh token rows and expired blacklist
    /// entries.
    #[instrument(skip_all)]
    pub async fn cleanup_expired(&self) -> Result<CleanupResponse, AuthError> {
        let refresh_tokens_removed = self
            .bounded(self.stores.refresh_tokens.cleanup_expired())
            .await?;
        let blacklist_entries_removed =
            self.bounded(self.stores.blacklist.cleanup_expired()).await?;

        info!(
            refresh_tokens_removed,
            blacklist_entries_removed, "Expired session records cleaned up"
        );
        Ok(CleanupResponse {
            refresh_tokens_removed,
            blacklist_entries_removed,
        })
    }

    /// Row counts of both ledgers.
    #[instrument(skip_all)]
    pub async fn stats(&self) -> Result<SessionStatsResponse, AuthError> {
        let refresh_tokens = self.bounded(self.stores.refresh_tokens.stats()).await?;
        let blacklist = self.bounded(self.stores.blacklist.stats()).await?;

        Ok(SessionStatsResponse {
            refresh_tokens,
            blacklist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::authorize;
    use crate::memory::MemoryStores;
    use chrono::Utc;
    use std::time::Duration as StdDuration;
    use taskhub_config::JwtConfig;
    use taskhub_models::UserStatus;

    const PASSWORD: &str = "password123";

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            issuer: "task-management-api".to_string(),
            audience: "task-management-frontend".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604800,
            leeway: 0,
        }
    }

    fn setup(config: SessionConfig) -> (SessionManager, MemoryStores) {
        let stores = MemoryStores::new(&jwt_config(), &config);
        let sessions = stores.session_manager(&jwt_config(), config);
        (sessions, stores)
    }

    async fn verified_user(sessions: &SessionManager, email: &str, role: Role) -> User {
        let request = RegisterRequest {
            username: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            password: PASSWORD.to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: None,
        };
        sessions.register(&request, role, true).await.unwrap()
    }

    async fn login(sessions: &SessionManager, email: &str) -> LoginOutcome {
        sessions.login(email, PASSWORD, None).await.unwrap()
    }

    #[tokio::test]
    async fn test_login_then_authorize() {
        let (sessions, _) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;

        let outcome = login(&sessions, "a@x.io").await;
        let context = sessions
            .authenticate(Some(&outcome.tokens.access_token))
            .await
            .unwrap();

        assert_eq!(context.user.id, user.id);
        assert_eq!(outcome.tokens.expires_in, 900);
        assert!(matches!(
            authorize(Some(&context), &[Role::Admin]),
            Err(AuthError::InsufficientPermissions { current: Role::User, .. })
        ));
        assert!(authorize(Some(&context), &[Role::User, Role::Admin]).is_ok());
    }

    #[tokio::test]
    async fn test_login_wrong_password_and_unknown_email_are_indistinguishable() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;

        let wrong_password = sessions.login("a@x.io", "nope", None).await.unwrap_err();
        let unknown_email = sessions.login("b@x.io", PASSWORD, None).await.unwrap_err();

        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_login_unverified_email() {
        let (sessions, stores) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        stores.credentials.set_verified(user.id, false);

        assert!(matches!(
            sessions.login("a@x.io", PASSWORD, None).await,
            Err(AuthError::EmailNotVerified)
        ));
        assert!(stores.refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_login_fails_closed_when_ledger_unavailable() {
        let (sessions, stores) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        stores.refresh_tokens.faults.set_unavailable(true);

        assert!(matches!(
            sessions.login("a@x.io", PASSWORD, None).await,
            Err(AuthError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_login_records_device_info() {
        let (sessions, stores) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let device = DeviceInfo {
            user_agent: Some("curl/8.0".to_string()),
            ip: Some("10.0.0.1".to_string()),
        };

        sessions
            .login("a@x.io", PASSWORD, Some(device.clone()))
            .await
            .unwrap();

        let active = stores.refresh_tokens.active_for_user(user.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].device_info, Some(device));
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;

        let request = RegisterRequest {
            username: "someone-else".to_string(),
            email: "a@x.io".to_string(),
            password: PASSWORD.to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            role: None,
        };
        assert!(matches!(
            sessions.register(&request, Role::User, false).await,
            Err(AuthError::UserExists)
        ));
    }

    #[tokio::test]
    async fn test_refresh_keeps_old_access_token_valid() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        let refreshed = sessions
            .refresh(&outcome.tokens.refresh_token, None)
            .await
            .unwrap();

        assert!(refreshed.refresh_token.is_none());
        assert!(sessions.authenticate(Some(&refreshed.access_token)).await.is_ok());
        assert!(
            sessions
                .authenticate(Some(&outcome.tokens.access_token))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_logout_blacklists_access_token_only() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let context = sessions
            .authenticate(Some(&outcome.tokens.access_token))
            .await
            .unwrap();

        sessions.logout(&context, None).await.unwrap();

        assert!(matches!(
            sessions.authenticate(Some(&outcome.tokens.access_token)).await,
            Err(AuthError::TokenBlacklisted)
        ));

        let refreshed = sessions
            .refresh(&outcome.tokens.refresh_token, None)
            .await
            .unwrap();
        assert!(sessions.authenticate(Some(&refreshed.access_token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_with_refresh_token_revokes_it() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let context = sessions
            .authenticate(Some(&outcome.tokens.access_token))
            .await
            .unwrap();

        sessions
            .logout(&context, Some(&outcome.tokens.refresh_token))
            .await
            .unwrap();

        assert!(matches!(
            sessions.refresh(&outcome.tokens.refresh_token, None).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_logout_ignores_refresh_token_of_another_user() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        verified_user(&sessions, "b@x.io", Role::User).await;
        let alice = login(&sessions, "a@x.io").await;
        let bob = login(&sessions, "b@x.io").await;
        let context = sessions
            .authenticate(Some(&alice.tokens.access_token))
            .await
            .unwrap();

        sessions
            .logout(&context, Some(&bob.tokens.refresh_token))
            .await
            .unwrap();

        assert!(sessions.refresh(&bob.tokens.refresh_token, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_logout_fails_when_blacklist_unavailable() {
        let (sessions, stores) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let context = sessions
            .authenticate(Some(&outcome.tokens.access_token))
            .await
            .unwrap();

        stores.blacklist.faults.set_unavailable(true);

        assert!(matches!(
            sessions.logout(&context, None).await,
            Err(AuthError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_force_logout_revokes_everything() {
        let (sessions, _) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let first = login(&sessions, "a@x.io").await;
        let second = login(&sessions, "a@x.io").await;

        let revoked = sessions
            .force_logout(user.id, BlacklistReason::SecurityBreach)
            .await
            .unwrap();

        assert_eq!(revoked, 2);
        for outcome in [&first, &second] {
            assert!(matches!(
                sessions.refresh(&outcome.tokens.refresh_token, None).await,
                Err(AuthError::RefreshTokenNotFoundOrExpired)
            ));
            assert!(matches!(
                sessions.authenticate(Some(&outcome.tokens.access_token)).await,
                Err(AuthError::TokenBlacklisted)
            ));
        }
    }

    #[tokio::test]
    async fn test_force_logout_leaves_other_users_alone() {
        let (sessions, _) = setup(SessionConfig::default());
        let alice = verified_user(&sessions, "a@x.io", Role::User).await;
        verified_user(&sessions, "b@x.io", Role::User).await;
        let bob = login(&sessions, "b@x.io").await;

        sessions
            .force_logout(alice.id, BlacklistReason::ForcedLogout)
            .await
            .unwrap();

        assert!(sessions.authenticate(Some(&bob.tokens.access_token)).await.is_ok());
        assert!(sessions.refresh(&bob.tokens.refresh_token, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_authenticate_missing_token() {
        let (sessions, _) = setup(SessionConfig::default());
        assert!(matches!(
            sessions.authenticate(None).await,
            Err(AuthError::TokenMissing)
        ));
        assert!(matches!(
            sessions.authenticate(Some("  ")).await,
            Err(AuthError::TokenMissing)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_token() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        assert!(matches!(
            sessions.authenticate(Some(&outcome.tokens.refresh_token)).await,
            Err(AuthError::InvalidTokenType)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        assert!(matches!(
            sessions.refresh(&outcome.tokens.access_token, None).await,
            Err(AuthError::InvalidTokenType)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_inactive_user() {
        let (sessions, stores) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        stores.credentials.set_status(user.id, UserStatus::Suspended);

        assert!(matches!(
            sessions.authenticate(Some(&outcome.tokens.access_token)).await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            sessions.refresh(&outcome.tokens.refresh_token, None).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_blacklist_rejects_valid_signature() {
        let (sessions, stores) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let token = outcome.tokens.access_token.as_str();

        assert!(sessions.signer().verify(token).is_ok());

        stores
            .blacklist
            .add(token, user.id, BlacklistReason::Logout)
            .await
            .unwrap();

        assert!(sessions.signer().verify(token).is_ok());
        assert!(matches!(
            sessions.authenticate(Some(token)).await,
            Err(AuthError::TokenBlacklisted)
        ));
    }

    #[tokio::test]
    async fn test_blacklisted_expired_token_reports_expiry() {
        let (sessions, stores) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let now = Utc::now().timestamp();
        let expired = sessions
            .signer()
            .sign(&Claims {
                sub: user.id.to_string(),
                email: user.email.clone(),
                role: Some(user.role),
                jti: None,
                token_type: TokenType::Access.as_str().to_string(),
                iat: now - 1000,
                exp: now - 100,
                iss: "task-management-api".to_string(),
                aud: "task-management-frontend".to_string(),
            })
            .unwrap();

        // The entry inherits the token's expiry, so it is already stale.
        stores
            .blacklist
            .add(&expired, user.id, BlacklistReason::Logout)
            .await
            .unwrap();

        assert!(!stores.blacklist.is_blacklisted(&expired).await.unwrap());
        assert!(matches!(
            sessions.authenticate(Some(&expired)).await,
            Err(AuthError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn test_blacklist_unavailable_fails_open() {
        let (sessions, stores) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        stores.blacklist.faults.set_unavailable(true);

        assert!(
            sessions
                .authenticate(Some(&outcome.tokens.access_token))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_blacklist_unavailable_fails_closed_when_configured() {
        let (sessions, stores) = setup(SessionConfig {
            blacklist_fail_open: false,
            ..SessionConfig::default()
        });
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        stores.blacklist.faults.set_unavailable(true);

        assert!(matches!(
            sessions.authenticate(Some(&outcome.tokens.access_token)).await,
            Err(AuthError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_blacklist_times_out_and_fails_open() {
        let (sessions, stores) = setup(SessionConfig {
            store_timeout: StdDuration::from_millis(20),
            ..SessionConfig::default()
        });
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        stores.blacklist.faults.set_latency(StdDuration::from_millis(500));

        assert!(
            sessions
                .authenticate(Some(&outcome.tokens.access_token))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_slow_ledger_times_out_on_refresh() {
        let (sessions, stores) = setup(SessionConfig {
            store_timeout: StdDuration::from_millis(20),
            ..SessionConfig::default()
        });
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        stores
            .refresh_tokens
            .faults
            .set_latency(StdDuration::from_millis(500));

        assert!(matches!(
            sessions.refresh(&outcome.tokens.refresh_token, None).await,
            Err(AuthError::Storage(StoreError::Timeout))
        ));
    }

    #[tokio::test]
    async fn test_refresh_after_ledger_expiry() {
        let (sessions, stores) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let jti = sessions
            .signer()
            .verify(&outcome.tokens.refresh_token)
            .unwrap()
            .jti
            .unwrap();

        stores.refresh_tokens.expire(&jti);

        assert!(matches!(
            sessions.refresh(&outcome.tokens.refresh_token, None).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_revoking_one_session_keeps_the_other() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        let second = login(&sessions, "a@x.io").await;
        let jti = sessions
            .signer()
            .verify(&second.tokens.refresh_token)
            .unwrap()
            .jti
            .unwrap();
        sessions.stores.refresh_tokens.revoke(&jti).await.unwrap();
        sessions.stores.refresh_tokens.revoke(&jti).await.unwrap();

        assert!(sessions.refresh(&outcome.tokens.refresh_token, None).await.is_ok());
        assert!(matches!(
            sessions.refresh(&second.tokens.refresh_token, None).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_rotation_issues_replacement_and_detects_reuse() {
        let (sessions, _) = setup(SessionConfig {
            rotate_refresh_tokens: true,
            ..SessionConfig::default()
        });
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        let rotated = sessions
            .refresh(&outcome.tokens.refresh_token, None)
            .await
            .unwrap();
        let replacement = rotated.refresh_token.unwrap();
        assert_eq!(sessions.active_sessions(user.id).await.unwrap().len(), 1);

        assert!(matches!(
            sessions.refresh(&outcome.tokens.refresh_token, None).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
        assert!(matches!(
            sessions.refresh(&replacement, None).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
        assert!(sessions.active_sessions(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_without_rotation_both_succeed() {
        let (sessions, _) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let token = outcome.tokens.refresh_token.as_str();

        let (a, b) = tokio::join!(sessions.refresh(token, None), sessions.refresh(token, None));

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.refresh_token.is_none());
        assert!(b.refresh_token.is_none());
        assert!(sessions.authenticate(Some(&a.access_token)).await.is_ok());
        assert!(sessions.authenticate(Some(&b.access_token)).await.is_ok());
        assert_eq!(sessions.active_sessions(user.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_rotation_has_single_winner() {
        let (sessions, _) = setup(SessionConfig {
            rotate_refresh_tokens: true,
            ..SessionConfig::default()
        });
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let token = outcome.tokens.refresh_token.as_str();

        let (a, b) = tokio::join!(sessions.refresh(token, None), sessions.refresh(token, None));

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    }

    #[tokio::test]
    async fn test_logout_all() {
        let (sessions, _) = setup(SessionConfig::default());
        let user = verified_user(&sessions, "a@x.io", Role::User).await;
        let first = login(&sessions, "a@x.io").await;
        let second = login(&sessions, "a@x.io").await;
        let context = sessions
            .authenticate(Some(&first.tokens.access_token))
            .await
            .unwrap();

        assert_eq!(sessions.logout_all(&context).await.unwrap(), 2);
        assert!(sessions.active_sessions(user.id).await.unwrap().is_empty());
        assert!(matches!(
            sessions.refresh(&second.tokens.refresh_token, None).await,
            Err(AuthError::RefreshTokenNotFoundOrExpired)
        ));
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let (sessions, stores) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        let context = sessions
            .authenticate(Some(&outcome.tokens.access_token))
            .await
            .unwrap();
        sessions
            .logout(&context, Some(&outcome.tokens.refresh_token))
            .await
            .unwrap();

        let report = sessions.cleanup_expired().await.unwrap();

        assert_eq!(report.refresh_tokens_removed, 1);
        assert_eq!(report.blacklist_entries_removed, 0);
        assert!(stores.refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn test_stats_reflect_logout() {
        let (sessions, stores) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        verified_user(&sessions, "b@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;
        login(&sessions, "b@x.io").await;
        let context = sessions
            .authenticate(Some(&outcome.tokens.access_token))
            .await
            .unwrap();
        sessions
            .logout(&context, Some(&outcome.tokens.refresh_token))
            .await
            .unwrap();

        let stats = sessions.stats().await.unwrap();

        assert_eq!(stats.refresh_tokens.total_tokens, 2);
        assert_eq!(stats.refresh_tokens.active_tokens, 1);
        assert_eq!(stats.refresh_tokens.revoked_tokens, 1);
        assert_eq!(stats.refresh_tokens.unique_users, 2);
        assert_eq!(stats.blacklist.total_blacklisted, 1);
        assert_eq!(stats.blacklist.logout_count, 1);

        stores.blacklist.faults.set_unavailable(true);
        assert!(matches!(sessions.stats().await, Err(AuthError::Storage(_))));
    }

    #[tokio::test]
    async fn test_authenticate_optional() {
        let (sessions, _) = setup(SessionConfig::default());
        verified_user(&sessions, "a@x.io", Role::User).await;
        let outcome = login(&sessions, "a@x.io").await;

        assert!(sessions.authenticate_optional(None).await.is_none());
        assert!(sessions.authenticate_optional(Some("garbage")).await.is_none());
        assert!(
            sessions
                .authenticate_optional(Some(&outcome.tokens.access_token))
                .await
                .is_some()
        );
    }
}
