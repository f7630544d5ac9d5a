use serde::Serialize;

use yamdb_core::UserId;

use crate::{Role, User};

/// Resolved identity of an authenticated caller.
///
/// Built from the stored account on every request, so role changes take effect
/// immediately even though bearer tokens only carry the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub role: Role,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl Principal {
    /// Role used for ladder comparisons; staff and superusers rank as admins.
    pub fn effective_role(&self) -> Role {
        if self.is_staff || self.is_superuser {
            Role::Admin
        } else {
            self.role
        }
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.as_str().to_string(),
            role: user.role,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

/// Who is making a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Caller {
    #[default]
    Anonymous,
    Authenticated(Principal),
}

impl Caller {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(p) => Some(p),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Caller::Authenticated(_))
    }

    pub fn role(&self) -> Role {
        self.principal()
            .map(Principal::effective_role)
            .unwrap_or(Role::Anonymous)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.principal().map(|p| p.user_id)
    }
}
