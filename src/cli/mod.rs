//! Operations behind the `taskhub-cli` binary.

use anyhow::{Context, bail};
use taskhub_auth::SessionManager;
use taskhub_core::Role;
use taskhub_models::{BlacklistReason, RegisterRequest, SessionStatsResponse, User};
use validator::Validate;

/// Creates a verified admin account. Admins cannot be created through the
/// public API without an existing admin, so the first one comes from here.
pub async fn create_admin(
    sessions: &SessionManager,
    request: RegisterRequest,
) -> anyhow::Result<User> {
    request.validate().context("Invalid admin details")?;

    let user = sessions.register(&request, Role::Admin, true).await?;
    Ok(user)
}

/// Parses the reason of a forced logout. `logout` is reserved for
/// user-initiated logouts.
pub fn parse_revocation_reason(value: &str) -> anyhow::Result<BlacklistReason> {
    match value.parse::<BlacklistReason>() {
        Ok(BlacklistReason::Logout) | Err(_) => {
            bail!("reason must be forced_logout or security_breach, got '{}'", value)
        }
        Ok(reason) => Ok(reason),
    }
}

/// Human-readable report of ledger statistics.
pub fn format_stats(stats: &SessionStatsResponse) -> String {
    let refresh = &stats.refresh_tokens;
    let blacklist = &stats.blacklist;
    format!(
        "Refresh tokens\n   Total: {}\n   Active: {}\n   Revoked: {}\n   Expired: {}\n   Users: {}\n\
         Blacklist\n   Total: {}\n   Active: {}\n   Logout: {}\n   Forced logout: {}\n   Security breach: {}",
        refresh.total_tokens,
        refresh.active_tokens,
        refresh.revoked_tokens,
        refresh.expired_tokens,
        refresh.unique_users,
        blacklist.total_blacklisted,
        blacklist.active_blacklisted,
        blacklist.logout_count,
        blacklist.forced_logout_count,
        blacklist.security_breach_count,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskhub_auth::memory::MemoryStores;
    use taskhub_config::{JwtConfig, SessionConfig};

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

    fn admin_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            username: "rootadmin".to_string(),
            email: email.to_string(),
            password: "supersecret123".to_string(),
            first_name: "Root".to_string(),
            last_name: "Admin".to_string(),
            role: None,
        }
    }

    #[tokio::test]
    async fn test_create_admin_can_log_in() {
        let jwt_config = jwt_config();
        let stores = MemoryStores::new(&jwt_config, &SessionConfig::default());
        let sessions = stores.session_manager(&jwt_config, SessionConfig::default());

        let admin = create_admin(&sessions, admin_request("root@example.com"))
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert!(admin.is_verified);

        let outcome = sessions
            .login("root@example.com", "supersecret123", None)
            .await
            .unwrap();
        assert_eq!(outcome.user.id, admin.id);
    }

    #[tokio::test]
    async fn test_create_admin_rejects_duplicate() {
        let jwt_config = jwt_config();
        let stores = MemoryStores::new(&jwt_config, &SessionConfig::default());
        let sessions = stores.session_manager(&jwt_config, SessionConfig::default());

        create_admin(&sessions, admin_request("root@example.com"))
            .await
            .unwrap();
        let err = create_admin(&sessions, admin_request("root@example.com"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn test_create_admin_validates_input() {
        let jwt_config = jwt_config();
        let stores = MemoryStores::new(&jwt_config, &SessionConfig::default());
        let sessions = stores.session_manager(&jwt_config, SessionConfig::default());

        let mut request = admin_request("not-an-email");
        request.password = "short".to_string();
        assert!(create_admin(&sessions, request).await.is_err());
    }

    #[test]
    fn test_parse_revocation_reason() {
        assert_eq!(
            parse_revocation_reason("forced_logout").unwrap(),
            BlacklistReason::ForcedLogout
        );
        assert_eq!(
            parse_revocation_reason("security_breach").unwrap(),
            BlacklistReason::SecurityBreach
        );
        assert!(parse_revocation_reason("logout").is_err());
        assert!(parse_revocation_reason("banned").is_err());
    }

    #[tokio::test]
    async fn test_format_stats_after_forced_logout() {
        let jwt_config = jwt_config();
        let stores = MemoryStores::new(&jwt_config, &SessionConfig::default());
        let sessions = stores.session_manager(&jwt_config, SessionConfig::default());
        let admin = create_admin(&sessions, admin_request("root@example.com"))
            .await
            .unwrap();
        sessions
            .login("root@example.com", "supersecret123", None)
            .await
            .unwrap();
        sessions
            .force_logout(admin.id, BlacklistReason::SecurityBreach)
            .await
            .unwrap();

        let report = format_stats(&sessions.stats().await.unwrap());

        assert!(report.contains("Revoked: 1"));
        assert!(report.contains("Users: 1"));
        assert!(report.contains("Security breach: 1"));
        assert!(report.contains("Forced logout: 0"));
    }
}
