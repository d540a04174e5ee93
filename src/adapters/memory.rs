use crate::adapters::MessageStore;
use crate::domain::message::{Message, MessageState, NewMessage};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use time::OffsetDateTime;

/// Process-local store. Each room is a vector in append order, mutated under its shard lock,
/// so readers never observe a half-applied append or sweep.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    rooms: DashMap<String, Vec<Message>>,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    #[tracing::instrument(level = "debug", skip(self, message), fields(room_id = %message.room_id))]
    async fn append(&self, message: NewMessage, now: OffsetDateTime, room_limit: usize) -> Result<Message> {
        let message = Message::create(message, now)?;

        let mut room = self.rooms.entry(message.room_id.clone()).or_default();
        // Keep the vector sorted even if a caller hands us an older `now`.
        let position = room.partition_point(|m| m.created_at <= message.created_at);
        room.insert(position, message.clone());

        let limit = room_limit.max(1);
        if room.len() > limit {
            let excess = room.len() - limit;
            room.drain(..excess);
            tracing::debug!(dropped = excess, "Room over capacity, dropped oldest messages");
        }

        Ok(message)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn list_by_room(&self, room_id: &str, now: OffsetDateTime) -> Result<Vec<Message>> {
        Ok(self
            .rooms
            .get(room_id)
            .map(|room| room.iter().filter(|m| m.state_at(now) == MessageState::Active).cloned().collect())
            .unwrap_or_default())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn sweep_expired(&self, now: OffsetDateTime) -> Result<u64> {
        let mut removed = 0u64;
        self.rooms.retain(|_, room| {
            let before = room.len();
            room.retain(|m| m.state_at(now) == MessageState::Active);
            removed += (before - room.len()) as u64;
            !room.is_empty()
        });
        Ok(removed)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    async fn prune_overflow(&self, limit: usize) -> Result<u64> {
        let mut removed = 0u64;
        self.rooms.retain(|_, room| {
            if room.len() > limit {
                let excess = room.len() - limit;
                room.drain(..excess);
                removed += excess as u64;
            }
            !room.is_empty()
        });
        Ok(removed)
    }

    async fn count_in_room(&self, room_id: &str) -> Result<u64> {
        Ok(self.rooms.get(room_id).map_or(0, |room| room.len() as u64))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
