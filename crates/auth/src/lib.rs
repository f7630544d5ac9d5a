//! `yamdb-auth`: identity, credentials and access policy.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod confirmation;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod user;

pub use authorize::{authorize, authorize_object, AuthzError};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use confirmation::{CodeError, ConfirmationCodes};
pub use jwt::{Hs256Jwt, JwtIssuer, JwtValidator};
pub use permissions::{may_modify, Action, Ownership, Policy, Rule};
pub use principal::{Caller, Principal};
pub use roles::Role;
pub use user::{NewUser, ProfileChanges, User, Username};
