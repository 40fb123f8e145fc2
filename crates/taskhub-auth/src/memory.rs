//! In-memory stores for tests.
//!
//! Each store can be switched into an unavailable state or given artificial
//! latency to exercise the failure policies of the session flows.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use taskhub_config::{JwtConfig, SessionConfig};
use taskhub_core::{BcryptHasher, StoreError};
use taskhub_models::{
    BlacklistEntry, BlacklistReason, BlacklistStats, DeviceInfo, NewUser, RefreshTokenRecord,
    RefreshTokenStats, User, UserStatus,
};
use uuid::Uuid;

use crate::jwt::TokenSigner;
use crate::session::{SessionManager, SessionStores};
use crate::store::{
    BlacklistLedger, CredentialStore, RefreshTokenLedger, USER_REVOCATION_PREFIX, blacklist_expiry,
    hash_token, user_revocation_hash,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Failure injection shared by the in-memory stores.
#[derive(Debug, Default)]
pub struct Faults {
    unavailable: AtomicBool,
    latency_ms: AtomicU64,
}

impl Faults {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_latency(&self, latency: StdDuration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    async fn check(&self) -> Result<(), StoreError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(StdDuration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::backend(std::io::Error::other(
                "store unavailable",
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    users: Mutex<HashMap<Uuid, User>>,
    pub faults: Faults,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, id: Uuid, status: UserStatus) {
        if let Some(user) = lock(&self.users).get_mut(&id) {
            user.status = status;
        }
    }

    pub fn set_verified(&self, id: Uuid, is_verified: bool) {
        if let Some(user) = lock(&self.users).get_mut(&id) {
            user.is_verified = is_verified;
        }
    }

    /// Looks a user up regardless of status.
    pub fn get(&self, id: Uuid) -> Option<User> {
        lock(&self.users).get(&id).cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.faults.check().await?;
        Ok(lock(&self.users)
            .get(&id)
            .filter(|user| user.is_active())
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.faults.check().await?;
        Ok(lock(&self.users)
            .values()
            .find(|user| user.email == email && user.is_active())
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<Option<User>, StoreError> {
        self.faults.check().await?;
        let mut users = lock(&self.users);
        if users
            .values()
            .any(|user| user.email == new_user.email || user.username == new_user.username)
        {
            return Ok(None);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            role: new_user.role,
            status: UserStatus::Active,
            is_verified: new_user.is_verified,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(Some(user))
    }
}

#[derive(Debug)]
pub struct MemoryRefreshTokenLedger {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
    ttl: Duration,
    pub faults: Faults,
}

impl MemoryRefreshTokenLedger {
    pub fn new(ttl: Duration) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            ttl,
            faults: Faults::default(),
        }
    }

    /// Moves the row's expiry into the past.
    pub fn expire(&self, jti: &str) {
        if let Some(record) = lock(&self.records).get_mut(jti) {
            record.expires_at = Utc::now() - Duration::seconds(1);
        }
    }

    pub fn get(&self, jti: &str) -> Option<RefreshTokenRecord> {
        lock(&self.records).get(jti).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RefreshTokenLedger for MemoryRefreshTokenLedger {
    async fn create(
        &self,
        user_id: Uuid,
        device_info: Option<DeviceInfo>,
    ) -> Result<RefreshTokenRecord, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let record = RefreshTokenRecord {
            id: Uuid::new_v4(),
            jti: Uuid::new_v4().to_string(),
            user_id,
            device_info,
            expires_at: now + self.ttl,
            created_at: now,
            last_used_at: now,
            is_revoked: false,
        };
        lock(&self.records).insert(record.jti.clone(), record.clone());
        Ok(record)
    }

    async fn find_valid(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        Ok(lock(&self.records)
            .get(jti)
            .filter(|record| record.is_valid_at(now))
            .cloned())
    }

    async fn touch_last_used(&self, id: Uuid) -> Result<(), StoreError> {
        self.faults.check().await?;
        if let Some(record) = lock(&self.records).values_mut().find(|r| r.id == id) {
            record.last_used_at = Utc::now();
        }
        Ok(())
    }

    async fn revoke(&self, jti: &str) -> Result<bool, StoreError> {
        self.faults.check().await?;
        Ok(match lock(&self.records).get_mut(jti) {
            Some(record) => {
                record.is_revoked = true;
                true
            }
            None => false,
        })
    }

    async fn consume(&self, jti: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let mut records = lock(&self.records);
        Ok(match records.get_mut(jti) {
            Some(record) if record.is_valid_at(now) => {
                record.is_revoked = true;
                record.last_used_at = now;
                Some(record.clone())
            }
            _ => None,
        })
    }

    async fn revoke_all_for_user(&self, user_id: Uuid) -> Result<u64, StoreError> {
        self.faults.check().await?;
        let mut revoked = 0;
        for record in lock(&self.records).values_mut() {
            if record.user_id == user_id && !record.is_revoked {
                record.is_revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }

    async fn active_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<RefreshTokenRecord>, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let mut active: Vec<_> = lock(&self.records)
            .values()
            .filter(|record| record.user_id == user_id && record.is_valid_at(now))
            .cloned()
            .collect();
        active.sort_by(|a, b| b.last_used_at.cmp(&a.last_used_at));
        Ok(active)
    }

    async fn cleanup_expired(&self) -> Result<u64, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let mut records = lock(&self.records);
        let before = records.len();
        records.retain(|_, record| record.is_valid_at(now));
        Ok((before - records.len()) as u64)
    }

    async fn stats(&self) -> Result<RefreshTokenStats, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let records = lock(&self.records);
        let rows = || records.values();

        Ok(RefreshTokenStats {
            total_tokens: records.len() as i64,
            active_tokens: rows().filter(|r| r.is_valid_at(now)).count() as i64,
            revoked_tokens: rows().filter(|r| r.is_revoked).count() as i64,
            expired_tokens: rows().filter(|r| r.expires_at <= now).count() as i64,
            unique_users: records
                .values()
                .map(|record| record.user_id)
                .collect::<HashSet<_>>()
                .len() as i64,
        })
    }
}

#[derive(Debug)]
pub struct MemoryBlacklistLedger {
    entries: Mutex<Vec<BlacklistEntry>>,
    fallback_ttl: Duration,
    pub faults: Faults,
}

impl MemoryBlacklistLedger {
    pub fn new(fallback_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            fallback_ttl,
            faults: Faults::default(),
        }
    }

    pub fn entries(&self) -> Vec<BlacklistEntry> {
        lock(&self.entries).clone()
    }
}

#[async_trait]
impl BlacklistLedger for MemoryBlacklistLedger {
    async fn add(
        &self,
        raw_token: &str,
        user_id: Uuid,
        reason: BlacklistReason,
    ) -> Result<bool, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let token_hash = hash_token(raw_token);
        let mut entries = lock(&self.entries);
        if entries.iter().any(|entry| entry.token_hash == token_hash) {
            return Ok(false);
        }

        entries.push(BlacklistEntry {
            jti: Uuid::new_v4().to_string(),
            token_hash,
            user_id: Some(user_id),
            expires_at: blacklist_expiry(raw_token, self.fallback_ttl, now),
            revoked_at: now,
            reason,
        });
        Ok(true)
    }

    async fn is_blacklisted(&self, raw_token: &str) -> Result<bool, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let token_hash = hash_token(raw_token);
        Ok(lock(&self.entries)
            .iter()
            .any(|entry| entry.token_hash == token_hash && entry.is_active_at(now)))
    }

    async fn revoke_user(
        &self,
        user_id: Uuid,
        reason: BlacklistReason,
        window: Duration,
    ) -> Result<DateTime<Utc>, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let token_hash = user_revocation_hash(user_id, now);
        let mut entries = lock(&self.entries);
        if !entries.iter().any(|entry| entry.token_hash == token_hash) {
            entries.push(BlacklistEntry {
                jti: Uuid::new_v4().to_string(),
                token_hash,
                user_id: Some(user_id),
                expires_at: now + window,
                revoked_at: now,
                reason,
            });
        }
        Ok(now)
    }

    async fn user_revoked_at(&self, user_id: Uuid) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        Ok(lock(&self.entries)
            .iter()
            .filter(|entry| {
                entry.user_id == Some(user_id)
                    && entry.token_hash.starts_with(USER_REVOCATION_PREFIX)
                    && entry.is_active_at(now)
            })
            .map(|entry| entry.revoked_at)
            .max())
    }

    async fn cleanup_expired(&self) -> Result<u64, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|entry| entry.is_active_at(now));
        Ok((before - entries.len()) as u64)
    }

    async fn stats(&self) -> Result<BlacklistStats, StoreError> {
        self.faults.check().await?;
        let now = Utc::now();
        let entries = lock(&self.entries);
        let with_reason = |reason: BlacklistReason| {
            entries.iter().filter(|entry| entry.reason == reason).count() as i64
        };

        Ok(BlacklistStats {
            total_blacklisted: entries.len() as i64,
            active_blacklisted: entries.iter().filter(|e| e.is_active_at(now)).count() as i64,
            logout_count: with_reason(BlacklistReason::Logout),
            forced_logout_count: with_reason(BlacklistReason::ForcedLogout),
            security_breach_count: with_reason(BlacklistReason::SecurityBreach),
        })
    }
}

/// bcrypt cost used by in-memory session managers.
pub const TEST_BCRYPT_COST: u32 = 4;

/// The three in-memory stores, wired the way the PostgreSQL ones are.
#[derive(Debug, Clone)]
pub struct MemoryStores {
    pub credentials: Arc<MemoryCredentialStore>,
    pub refresh_tokens: Arc<MemoryRefreshTokenLedger>,
    pub blacklist: Arc<MemoryBlacklistLedger>,
}

impl MemoryStores {
    pub fn new(jwt_config: &JwtConfig, session_config: &SessionConfig) -> Self {
        Self {
            credentials: Arc::new(MemoryCredentialStore::new()),
            refresh_tokens: Arc::new(MemoryRefreshTokenLedger::new(Duration::seconds(
                jwt_config.refresh_token_expiry,
            ))),
            blacklist: Arc::new(MemoryBlacklistLedger::new(Duration::seconds(
                session_config.blacklist_fallback_ttl,
            ))),
        }
    }

    pub fn session_stores(&self) -> SessionStores {
        SessionStores {
            credentials: self.credentials.clone(),
            refresh_tokens: self.refresh_tokens.clone(),
            blacklist: self.blacklist.clone(),
        }
    }

    /// A session manager over these stores with a cheap bcrypt cost.
    pub fn session_manager(
        &self,
        jwt_config: &JwtConfig,
        session_config: SessionConfig,
    ) -> SessionManager {
        SessionManager::new(
            self.session_stores(),
            TokenSigner::new(jwt_config),
            Arc::new(BcryptHasher::new(TEST_BCRYPT_COST)),
            session_config,
        )
    }
}
