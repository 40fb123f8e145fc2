use crate::parse_env;

/// Password hashing configuration.
///
/// - `BCRYPT_COST`: bcrypt work factor (default: 12)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordConfig {
    pub bcrypt_cost: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self { bcrypt_cost: 12 }
    }
}

impl PasswordConfig {
    pub fn from_env() -> Self {
        Self {
            bcrypt_cost: parse_env("BCRYPT_COST").unwrap_or(Self::default().bcrypt_cost),
        }
    }
}
