use crate::domain::room::{RoomId, SenderFingerprint};
use crate::error::{AppError, Result};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// A stored room message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub room_id: String,
    pub stored_content: String,
    pub sender_fingerprint: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Lifecycle of a stored message. Stores serve only `Active` messages and the sweep removes
/// `Expired` ones; a removed message has no state left to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Active,
    Expired,
}

impl Message {
    /// Builds a new message stamped at `now`.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` if `ttl` is zero or negative.
    pub fn create(new: NewMessage, now: OffsetDateTime) -> Result<Self> {
        if !new.ttl.is_positive() {
            return Err(AppError::BadRequest("Message lifetime must be positive".into()));
        }

        Ok(Self {
            id: Uuid::now_v7(),
            room_id: new.room_id.as_str().to_string(),
            stored_content: new.stored_content,
            sender_fingerprint: new.sender_fingerprint.into_inner(),
            created_at: now,
            expires_at: now + new.ttl,
        })
    }

    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    #[must_use]
    pub fn state_at(&self, now: OffsetDateTime) -> MessageState {
        if self.is_expired_at(now) { MessageState::Expired } else { MessageState::Active }
    }
}

/// Everything the store needs to create a message; id and timestamps are assigned on append.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub room_id: RoomId,
    pub stored_content: String,
    pub sender_fingerprint: SenderFingerprint,
    pub ttl: Duration,
}

/// A message successfully revealed under the reader's session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedMessage {
    pub id: Uuid,
    pub plaintext: String,
    pub sender_fingerprint: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

/// Metadata returned after a successful post. Never carries content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedMessage {
    pub id: Uuid,
    pub room_id: String,
    pub sender_fingerprint: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl From<Message> for PostedMessage {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_fingerprint: message.sender_fingerprint,
            created_at: message.created_at,
            expires_at: message.expires_at,
        }
    }
}
