use thiserror::Error;

use yamdb_core::UserId;

use crate::{Action, Caller, Policy};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication credentials were not provided")]
    Unauthenticated,

    #[error("you do not have permission to perform this action")]
    Forbidden,
}

fn denied(caller: &Caller) -> AuthzError {
    if caller.is_authenticated() {
        AuthzError::Forbidden
    } else {
        AuthzError::Unauthenticated
    }
}

/// Request-level authorization.
///
/// - No IO
/// - No side effects
pub fn authorize(policy: &Policy, caller: &Caller, action: Action) -> Result<(), AuthzError> {
    if policy.allows(caller, action) {
        Ok(())
    } else {
        Err(denied(caller))
    }
}

/// Object-level authorization against the object's author.
pub fn authorize_object(
    policy: &Policy,
    caller: &Caller,
    action: Action,
    owner: UserId,
) -> Result<(), AuthzError> {
    authorize(policy, caller, action)?;
    if policy.allows_object(caller, action, owner) {
        Ok(())
    } else {
        Err(denied(caller))
    }
}
