//! API-side authorization guard.
//!
//! Each resource declares one [`Policy`]; handlers call [`guard`] before doing
//! any work and [`guard_object`] once the target object (and its author) is
//! known. Domain and storage layers stay auth-agnostic.

use axum::http::Method;

use yamdb_auth::{authorize, authorize_object, Action, AuthzError, Policy, Rule};
use yamdb_core::UserId;

use crate::context::CallerContext;

/// Categories, genres and titles: anyone may read, admins may write.
pub fn catalog_policy() -> Policy {
    Policy::from(Rule::ReadOnly).or(Rule::IsAdmin)
}

/// User administration.
pub fn users_policy() -> Policy {
    Policy::from(Rule::IsAdmin)
}

/// `/users/me`.
pub fn own_profile_policy() -> Policy {
    Policy::from(Rule::IsAuthenticated)
}

/// Reviews and comments: public reads, authenticated writes, and only the
/// author or a moderator may change an existing object.
pub fn feedback_policy() -> Policy {
    Policy::from(Rule::IsOwnerOrModerator)
}

pub fn guard(policy: &Policy, ctx: &CallerContext, method: &Method) -> Result<(), AuthzError> {
    authorize(policy, ctx.caller(), Action::from_method(method.as_str()))
        .inspect_err(|e| log_denial(ctx, method, e))
}

pub fn guard_object(
    policy: &Policy,
    ctx: &CallerContext,
    method: &Method,
    owner: UserId,
) -> Result<(), AuthzError> {
    authorize_object(policy, ctx.caller(), Action::from_method(method.as_str()), owner)
        .inspect_err(|e| log_denial(ctx, method, e))
}

fn log_denial(ctx: &CallerContext, method: &Method, err: &AuthzError) {
    tracing::warn!(
        user_id = ctx.user_id().map(|id| id.get()),
        role = ctx.caller().role().as_str(),
        method = %method,
        reason = %err,
        "authorization denied"
    );
}
