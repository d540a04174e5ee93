use crate::domain::message::Message;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct MessageRecord {
    pub(crate) id: Uuid,
    pub(crate) room_id: String,
    pub(crate) encrypted_content: String,
    pub(crate) sender_key: String,
    pub(crate) created_at: OffsetDateTime,
    pub(crate) expires_at: OffsetDateTime,
}

impl From<MessageRecord> for Message {
    fn from(record: MessageRecord) -> Self {
        Self {
            id: record.id,
            room_id: record.room_id,
            stored_content: record.encrypted_content,
            sender_fingerprint: record.sender_key,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}
