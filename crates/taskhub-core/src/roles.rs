//! Role hierarchy.
//!
//! Roles form a total order `user < manager < admin`. Persisted rows and legacy
//! clients may refer to a role either by numeric id (1 = admin, 2 = user,
//! 3 = manager) or by name; [`normalize_role`] accepts both and falls back to
//! [`Role::User`] for anything it does not recognise.
//!
//! String comparisons through [`has_permission`] rank unknown names as 0, so a
//! comparison involving an unknown role is always `false`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Manager, Role::Admin];

    /// Privilege rank, higher means more privileges. Defined roles start at 1.
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Manager => 2,
            Role::Admin => 3,
        }
    }

    /// Numeric role id as stored by legacy clients.
    pub fn id(self) -> i64 {
        match self {
            Role::Admin => 1,
            Role::User => 2,
            Role::Manager => 3,
        }
    }

    pub fn from_id(id: i64) -> Option<Role> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::User),
            3 => Some(Role::Manager),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// True iff this role ranks at or above `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// A role reference as submitted by clients: numeric id or name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum RoleInput {
    Id(i64),
    Name(String),
}

/// Resolves a role id or name, defaulting to [`Role::User`] when unknown.
pub fn normalize_role(input: &RoleInput) -> Role {
    match input {
        RoleInput::Id(id) => Role::from_id(*id),
        RoleInput::Name(name) => name.parse().ok(),
    }
    .unwrap_or(Role::User)
}

/// Rank of a role name; 0 for names outside the hierarchy.
pub fn rank_of(role: &str) -> u8 {
    role.parse::<Role>().map(Role::rank).unwrap_or(0)
}

/// True iff `user_role` ranks at or above `required_role` and both are known.
pub fn has_permission(user_role: &str, required_role: &str) -> bool {
    let user_rank = rank_of(user_role);
    let required_rank = rank_of(required_role);
    user_rank > 0 && required_rank > 0 && user_rank >= required_rank
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert_eq!(Role::User.rank(), 1);
        assert_eq!(Role::Manager.rank(), 2);
        assert_eq!(Role::Admin.rank(), 3);
        assert!(Role::User < Role::Manager && Role::Manager < Role::Admin);
    }

    #[test]
    fn test_has_permission_matches_rank_order() {
        for user in Role::ALL {
            for required in Role::ALL {
                assert_eq!(
                    has_permission(user.as_str(), required.as_str()),
                    user.rank() >= required.rank(),
                    "{} vs {}",
                    user,
                    required
                );
                assert_eq!(user.satisfies(required), user >= required);
            }
        }
    }

    #[test]
    fn test_has_permission_unknown_roles_are_false() {
        for role in Role::ALL {
            assert!(!has_permission(role.as_str(), "superuser"));
            assert!(!has_permission("superuser", role.as_str()));
        }
        assert!(!has_permission("", ""));
        assert!(!has_permission("root", "root"));
    }

    #[test]
    fn test_has_permission_is_case_insensitive() {
        assert!(has_permission("ADMIN", "manager"));
        assert!(has_permission(" Manager ", "USER"));
    }

    #[test]
    fn test_parse_role_from_string() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Manager".parse::<Role>(), Ok(Role::Manager));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_normalize_role_by_id() {
        assert_eq!(normalize_role(&RoleInput::Id(1)), Role::Admin);
        assert_eq!(normalize_role(&RoleInput::Id(2)), Role::User);
        assert_eq!(normalize_role(&RoleInput::Id(3)), Role::Manager);
        assert_eq!(normalize_role(&RoleInput::Id(42)), Role::User);
    }

    #[test]
    fn test_normalize_role_by_name() {
        assert_eq!(
            normalize_role(&RoleInput::Name("ADMIN".to_string())),
            Role::Admin
        );
        assert_eq!(
            normalize_role(&RoleInput::Name("wizard".to_string())),
            Role::User
        );
    }

    #[test]
    fn test_role_ids_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
    }

    #[test]
    fn test_role_input_deserializes_id_or_name() {
        let by_id: RoleInput = serde_json::from_str("3").unwrap();
        let by_name: RoleInput = serde_json::from_str(r#""manager""#).unwrap();
        assert_eq!(normalize_role(&by_id), normalize_role(&by_name));
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Manager).unwrap(), r#""manager""#);
    }
}
