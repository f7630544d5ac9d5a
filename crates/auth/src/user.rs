//! User accounts.
//!
//! Accounts are created either by the email self-registration flow or by an
//! administrator. Self-registered accounts get a random password that is hashed
//! and never disclosed, so the only way in is the confirmation-code exchange.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use yamdb_core::{DomainError, DomainResult, Email, UserId, ValidationErrors};

use crate::Role;

pub const MAX_USERNAME_LEN: usize = 150;
pub const MAX_PERSONAL_NAME_LEN: usize = 150;
pub const MAX_BIO_LEN: usize = 500;

/// Usernames that collide with fixed routes.
const RESERVED_USERNAMES: &[&str] = &["me"];

// ─────────────────────────────────────────────────────────────────────────────
// Username
// ─────────────────────────────────────────────────────────────────────────────

/// Public handle of an account; `/users/{username}` is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        if raw.is_empty() {
            return Err(DomainError::field("username", "This field may not be blank."));
        }
        if raw.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::field(
                "username",
                format!("Ensure this field has no more than {MAX_USERNAME_LEN} characters."),
            ));
        }
        if !raw.chars().all(is_username_char) {
            return Err(DomainError::field(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            ));
        }
        if RESERVED_USERNAMES.contains(&raw) {
            return Err(DomainError::field(
                "username",
                format!("\"{raw}\" is reserved and cannot be used as a username."),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a username from the local part of an email address.
    ///
    /// Characters that are not allowed in usernames become `_`.
    pub fn from_email(email: &Email) -> Self {
        let mut base: String = email
            .local_part()
            .chars()
            .map(|c| if is_username_char(c) { c } else { '_' })
            .take(MAX_USERNAME_LEN)
            .collect();
        if base.is_empty() || RESERVED_USERNAMES.contains(&base.as_str()) {
            base.push_str("_user");
        }
        Self(base)
    }

    /// `self`, then `self2`, `self3`, ... for resolving collisions.
    pub fn candidates(&self) -> impl Iterator<Item = Username> + '_ {
        core::iter::once(self.clone()).chain((2u32..).map(move |n| {
            let suffix = n.to_string();
            let keep = MAX_USERNAME_LEN - suffix.len();
            let stem: String = self.0.chars().take(keep).collect();
            Username(format!("{stem}{suffix}"))
        }))
    }
}

fn is_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-')
}

impl core::fmt::Display for Username {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// A persisted account.
///
/// # Invariants
/// - `email` uniquely identifies an account.
/// - `username` is unique.
/// - `role` only changes through administrator updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub username: Username,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub password_hash: String,
    /// Last successful code redemption; part of the confirmation-code state.
    pub last_login: Option<DateTime<Utc>>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Apply validated profile changes in place.
    pub fn apply(&mut self, changes: ProfileChanges) {
        if let Some(username) = changes.username {
            self.username = username;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(first_name) = changes.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            self.last_name = last_name;
        }
        if let Some(bio) = changes.bio {
            self.bio = bio;
        }
        if let Some(role) = changes.role {
            self.role = role;
        }
    }
}

/// Input for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: Email,
    pub username: Username,
    pub first_name: String,
    pub last_name: String,
    pub bio: String,
    pub role: Role,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub password_hash: String,
}

impl NewUser {
    /// A regular account with a random, undisclosed password.
    pub fn with_random_password(email: Email, username: Username) -> Self {
        Self {
            email,
            username,
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: Role::User,
            is_staff: false,
            is_superuser: false,
            password_hash: random_password_hash(),
        }
    }
}

/// Partial update of profile fields. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub username: Option<Username>,
    pub email: Option<Email>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub role: Option<Role>,
}

impl ProfileChanges {
    /// Drop any requested role change (self-service updates).
    pub fn without_role(self) -> Self {
        Self { role: None, ..self }
    }
}

/// Bound-check the free-text profile fields, collecting every violation.
pub fn validate_profile_text(
    first_name: Option<&str>,
    last_name: Option<&str>,
    bio: Option<&str>,
) -> DomainResult<()> {
    let mut errors = ValidationErrors::new();
    for (field, value, max) in [
        ("first_name", first_name, MAX_PERSONAL_NAME_LEN),
        ("last_name", last_name, MAX_PERSONAL_NAME_LEN),
        ("bio", bio, MAX_BIO_LEN),
    ] {
        if let Some(value) = value {
            if value.chars().count() > max {
                errors.add(field, format!("Ensure this field has no more than {max} characters."));
            }
        }
    }
    errors.into_result()
}

// ─────────────────────────────────────────────────────────────────────────────
// Passwords
// ─────────────────────────────────────────────────────────────────────────────

/// Hash of a freshly generated random password.
///
/// Format: `sha256$<salt hex>$<digest hex>`. The plaintext is dropped here.
pub fn random_password_hash() -> String {
    let password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(40)
        .map(char::from)
        .collect();

    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    format!("sha256${}${}", hex::encode(salt), hex::encode(hasher.finalize()))
}
