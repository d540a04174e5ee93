use crate::domain::message::{PostedMessage, RevealedMessage};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Body of `POST /messages`. Missing fields default to empty so they fail validation with a
/// readable message instead of a deserializer error.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[serde(default)]
    pub room_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in_minutes: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageResponse {
    pub id: Uuid,
    pub room_id: String,
    pub sender_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<PostedMessage> for PostMessageResponse {
    fn from(message: PostedMessage) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_key: message.sender_fingerprint,
            expires_at: message.expires_at,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMessageResponse {
    pub id: Uuid,
    pub content: String,
    pub sender_key: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<RevealedMessage> for RoomMessageResponse {
    fn from(message: RevealedMessage) -> Self {
        Self {
            id: message.id,
            content: message.plaintext,
            sender_key: message.sender_fingerprint,
            created_at: message.created_at,
            expires_at: message.expires_at,
        }
    }
}
