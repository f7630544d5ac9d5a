//! Permission predicates and their composition.
//!
//! Each endpoint declares a [`Policy`] built from the three base predicates
//! (read-only, admin, owner-or-moderator) plus plain authentication.
//! Evaluation happens in two steps: [`Policy::allows`] before the target object
//! is loaded, and [`Policy::allows_object`] once its author is known.

use crate::{Caller, Principal, Role};

/// What a request does to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// GET / HEAD / OPTIONS.
    Read,
    /// Everything else.
    Write,
}

impl Action {
    /// Classify an HTTP method name.
    pub fn from_method(method: &str) -> Self {
        match method {
            "GET" | "HEAD" | "OPTIONS" => Action::Read,
            _ => Action::Write,
        }
    }

    pub fn is_safe(self) -> bool {
        matches!(self, Action::Read)
    }
}

/// Relationship between the caller and the object being touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owner,
    Other,
}

/// The single write policy for user-authored content.
///
/// Authors may modify their own objects; moderators and above may modify anyone's.
pub fn may_modify(role: Role, ownership: Ownership) -> bool {
    if role == Role::Anonymous {
        return false;
    }
    ownership == Ownership::Owner || role.at_least(Role::Moderator)
}

/// Active admin-role account, or a staff/superuser account.
pub fn is_admin(principal: &Principal) -> bool {
    (principal.is_active && principal.role == Role::Admin)
        || principal.is_staff
        || principal.is_superuser
}

/// Base predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Safe methods only.
    ReadOnly,
    /// See [`is_admin`].
    IsAdmin,
    /// Any authenticated caller.
    IsAuthenticated,
    /// Safe methods for everyone; writes need authentication, and at object
    /// level either authorship or moderator rank.
    IsOwnerOrModerator,
}

impl Rule {
    fn allows(self, caller: &Caller, action: Action) -> bool {
        match self {
            Rule::ReadOnly => action.is_safe(),
            Rule::IsAdmin => caller.principal().is_some_and(is_admin),
            Rule::IsAuthenticated => caller.is_authenticated(),
            Rule::IsOwnerOrModerator => action.is_safe() || caller.is_authenticated(),
        }
    }

    fn allows_object(self, caller: &Caller, action: Action, owner: yamdb_core::UserId) -> bool {
        match self {
            Rule::IsOwnerOrModerator => {
                if action.is_safe() {
                    return true;
                }
                let ownership = if caller.user_id() == Some(owner) {
                    Ownership::Owner
                } else {
                    Ownership::Other
                };
                may_modify(caller.role(), ownership)
            }
            _ => true,
        }
    }
}

/// Composable access policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    Rule(Rule),
    Any(Vec<Policy>),
    All(Vec<Policy>),
}

impl From<Rule> for Policy {
    fn from(rule: Rule) -> Self {
        Policy::Rule(rule)
    }
}

impl Policy {
    pub fn or(self, other: impl Into<Policy>) -> Policy {
        match self {
            Policy::Any(mut items) => {
                items.push(other.into());
                Policy::Any(items)
            }
            this => Policy::Any(vec![this, other.into()]),
        }
    }

    pub fn and(self, other: impl Into<Policy>) -> Policy {
        match self {
            Policy::All(mut items) => {
                items.push(other.into());
                Policy::All(items)
            }
            this => Policy::All(vec![this, other.into()]),
        }
    }

    /// Request-level check (before the object is known).
    pub fn allows(&self, caller: &Caller, action: Action) -> bool {
        match self {
            Policy::Rule(rule) => rule.allows(caller, action),
            Policy::Any(items) => items.iter().any(|p| p.allows(caller, action)),
            Policy::All(items) => items.iter().all(|p| p.allows(caller, action)),
        }
    }

    /// Object-level check; a branch of an `Any` only counts when its
    /// request-level check passed too.
    pub fn allows_object(&self, caller: &Caller, action: Action, owner: yamdb_core::UserId) -> bool {
        match self {
            Policy::Rule(rule) => rule.allows_object(caller, action, owner),
            Policy::Any(items) => items
                .iter()
                .any(|p| p.allows(caller, action) && p.allows_object(caller, action, owner)),
            Policy::All(items) => items.iter().all(|p| p.allows_object(caller, action, owner)),
        }
    }
}
