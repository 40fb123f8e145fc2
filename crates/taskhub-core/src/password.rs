//! Password hashing capability.
//!
//! The session manager only sees [`PasswordHasher`], so the work factor (or the
//! algorithm) can change without touching the login flow. Both operations are
//! CPU-bound; async callers should run them on a blocking thread.

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::AuthError;

pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError>;
}

/// bcrypt with a configurable cost.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        hash(plaintext, self.cost)
            .map_err(|e| AuthError::Internal(format!("Failed to hash password: {}", e)))
    }

    fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError> {
        verify(plaintext, digest)
            .map_err(|e| AuthError::Internal(format!("Failed to verify password: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify() {
        let hasher = BcryptHasher::new(TEST_COST);
        let digest = hasher.hash("password123").unwrap();

        assert_ne!(digest, "password123");
        assert!(hasher.verify("password123", &digest).unwrap());
        assert!(!hasher.verify("password124", &digest).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = BcryptHasher::new(TEST_COST);
        let a = hasher.hash("same").unwrap();
        let b = hasher.hash("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_rejects_malformed_digest() {
        let hasher = BcryptHasher::new(TEST_COST);
        assert!(hasher.verify("password", "not-a-bcrypt-hash").is_err());
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(BcryptHasher::default().cost(), DEFAULT_COST);
    }
}
