use uuid::Uuid;

use yamdb_auth::{Caller, Principal};
use yamdb_core::UserId;

/// Correlation id assigned to every request by the tracing middleware.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Identity of the caller for a request.
///
/// Always present on API routes; anonymous when no bearer token was sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerContext {
    caller: Caller,
}

impl CallerContext {
    pub fn new(caller: Caller) -> Self {
        Self { caller }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.caller.principal()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.caller.user_id()
    }
}
