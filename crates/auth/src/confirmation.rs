//! Confirmation codes for the passwordless email flow.
//!
//! A code is `<issued-at, hex>-<truncated HMAC-SHA256>` over the account's
//! id, email, password hash and last login plus the issue time. Nothing is
//! stored server-side:
//! - codes expire after the configured TTL;
//! - a successful redemption updates `last_login`, which changes the MAC input
//!   and therefore invalidates every code issued before it.

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::User;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of the MAC kept in the code (hex-encoded to twice as many chars).
const TAG_LEN: usize = 10;
const CONTEXT: &[u8] = b"yamdb.confirmation-code.v1";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    #[error("confirmation code is malformed")]
    Malformed,

    #[error("confirmation code is invalid")]
    Mismatch,

    #[error("confirmation code has expired")]
    Expired,

    #[error("confirmation code key is unusable")]
    Key,
}

/// Stateless issuer/checker of confirmation codes.
#[derive(Clone)]
pub struct ConfirmationCodes {
    secret: Vec<u8>,
    ttl: Duration,
}

impl core::fmt::Debug for ConfirmationCodes {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfirmationCodes").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl ConfirmationCodes {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String, CodeError> {
        let ts = now.timestamp().max(0) as u64;
        let tag = self.mac(user, ts)?.finalize().into_bytes();
        Ok(format!("{}-{}", hex::encode(ts.to_be_bytes()), hex::encode(&tag[..TAG_LEN])))
    }

    pub fn verify(&self, user: &User, code: &str, now: DateTime<Utc>) -> Result<(), CodeError> {
        let (ts_part, tag_part) = code.trim().split_once('-').ok_or(CodeError::Malformed)?;
        let ts: [u8; 8] = hex::decode(ts_part)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(CodeError::Malformed)?;
        let ts = u64::from_be_bytes(ts);
        let tag = hex::decode(tag_part).map_err(|_| CodeError::Malformed)?;
        if tag.len() != TAG_LEN {
            return Err(CodeError::Malformed);
        }

        self.mac(user, ts)?
            .verify_truncated_left(&tag)
            .map_err(|_| CodeError::Mismatch)?;

        let issued_at = DateTime::<Utc>::from_timestamp(ts as i64, 0).ok_or(CodeError::Malformed)?;
        if now - issued_at > self.ttl {
            return Err(CodeError::Expired);
        }
        Ok(())
    }

    fn mac(&self, user: &User, ts: u64) -> Result<HmacSha256, CodeError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|_| CodeError::Key)?;
        mac.update(CONTEXT);
        mac.update(&user.id.get().to_be_bytes());
        mac.update(user.email.as_str().as_bytes());
        mac.update(b"\0");
        mac.update(user.password_hash.as_bytes());
        mac.update(b"\0");
        let login = user.last_login.map(|t| t.timestamp_micros()).unwrap_or(-1);
        mac.update(&login.to_be_bytes());
        mac.update(&ts.to_be_bytes());
        Ok(mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Role, Username};
    use yamdb_core::{Email, UserId};

    fn user() -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("alice@example.com").unwrap(),
            username: Username::parse("alice").unwrap(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: Role::User,
            is_active: true,
            is_staff: false,
            is_superuser: false,
            password_hash: "sha256$00$11".into(),
            last_login: None,
            date_joined: Utc::now(),
        }
    }

    fn codes() -> ConfirmationCodes {
        ConfirmationCodes::new(b"secret".to_vec(), Duration::hours(72))
    }

    #[test]
    fn issued_code_verifies() {
        let now = Utc::now();
        let u = user();
        let code = codes().issue(&u, now).unwrap();
        assert!(codes().verify(&u, &code, now).is_ok());
    }

    #[test]
    fn code_is_bound_to_the_account() {
        let now = Utc::now();
        let code = codes().issue(&user(), now).unwrap();
        let mut other = user();
        other.id = UserId::new(2);
        assert_eq!(codes().verify(&other, &code, now), Err(CodeError::Mismatch));
    }

    #[test]
    fn redemption_state_change_invalidates_code() {
        let now = Utc::now();
        let mut u = user();
        let code = codes().issue(&u, now).unwrap();
        u.last_login = Some(now);
        assert_eq!(codes().verify(&u, &code, now), Err(CodeError::Mismatch));
    }

    #[test]
    fn code_expires() {
        let issued = Utc::now() - Duration::hours(73);
        let u = user();
        let code = codes().issue(&u, issued).unwrap();
        assert_eq!(codes().verify(&u, &code, Utc::now()), Err(CodeError::Expired));
    }

    #[test]
    fn malformed_codes() {
        let u = user();
        for code in ["", "abc", "zz-nothex", "1-abcd", "00000000-abcd"] {
            assert_eq!(codes().verify(&u, code, Utc::now()), Err(CodeError::Malformed), "{code:?}");
        }
    }

    #[test]
    fn issue_time_is_fixed_width_hex() {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        let code = codes().issue(&user(), now).unwrap();
        let (ts, tag) = code.split_once('-').unwrap();
        assert_eq!(ts, "000000006553f100");
        assert_eq!(tag.len(), TAG_LEN * 2);
    }
}
