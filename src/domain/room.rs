use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::fmt;

/// A caller-named room. Knowing the id is the only thing needed to post into or read from it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RoomId(String);

impl RoomId {
    /// Validates a caller-supplied room identifier.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if the id is blank or longer than `max_len` characters.
    pub fn parse(raw: &str, max_len: usize) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(AppError::BadRequest("roomId must not be empty".into()));
        }
        if raw.chars().count() > max_len {
            return Err(AppError::BadRequest(format!("roomId must be at most {max_len} characters")));
        }
        Ok(Self(raw.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The opaque per-client token. It doubles as key material, so it is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// # Errors
    /// Returns `AppError::IdentityRequired` if the token is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(AppError::IdentityRequired);
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Lets a client tell its own messages apart from others' in a room view.
///
/// Anyone holding a token can recompute the fingerprint for any room, so it carries no authority.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SenderFingerprint(String);

impl SenderFingerprint {
    #[must_use]
    pub fn derive(token: &SessionToken, room_id: &RoomId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(token.expose().as_bytes());
        hasher.update(room_id.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}
