//! Email address value object (the login identifier of an account).

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

/// A syntactically valid email address with a lower-cased domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Validate and normalize an address.
    ///
    /// The local part is kept verbatim; the domain is lower-cased.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(invalid("This field may not be blank."));
        }
        if raw.len() > MAX_LEN {
            return Err(invalid(format!("Ensure this field has no more than {MAX_LEN} characters.")));
        }

        let Some((local, domain)) = raw.rsplit_once('@') else {
            return Err(invalid("Enter a valid email address."));
        };

        if local.is_empty() || local.len() > MAX_LOCAL_LEN || local.contains('@') {
            return Err(invalid("Enter a valid email address."));
        }
        if local.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(invalid("Enter a valid email address."));
        }
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return Err(invalid("Enter a valid email address."));
        }
        if !valid_domain(domain) {
            return Err(invalid("Enter a valid email address."));
        }

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the final `@`.
    pub fn local_part(&self) -> &str {
        self.0.rsplit_once('@').map(|(local, _)| local).unwrap_or(&self.0)
    }

    pub fn domain(&self) -> &str {
        self.0.rsplit_once('@').map(|(_, domain)| domain).unwrap_or("")
    }
}

fn valid_domain(domain: &str) -> bool {
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::field("email", message)
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}
