use core::str::FromStr;

use serde::{Deserialize, Serialize};

use yamdb_core::DomainError;

/// Authorization level of an account.
///
/// Variants are declared in ascending privilege order, so `Ord` doubles as the
/// authorization ladder (`Anonymous < User < Moderator < Admin`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[serde(alias = "anonim")]
    Anonymous,
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Anonymous, Role::User, Role::Moderator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// True when this role is `other` or ranks above it.
    pub fn at_least(self, other: Role) -> bool {
        self >= other
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anonymous" | "anonim" => Ok(Role::Anonymous),
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::field(
                "role",
                format!("\"{other}\" is not a valid choice."),
            )),
        }
    }
}
