pub mod database;
pub mod memory;

use crate::domain::message::{Message, NewMessage};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use time::OffsetDateTime;

/// Room-keyed message storage with expiry-aware reads.
///
/// Every time-dependent operation takes `now` from the caller so that expiry is decided by a
/// single clock.
#[async_trait]
pub trait MessageStore: Send + Sync + Debug {
    /// Creates a message stamped at `now`, then drops the oldest messages of its room so that at
    /// most `room_limit` remain. A limit of zero still keeps one message, so a fresh post is always readable.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for a non-positive lifetime, or a storage error. Nothing is
    /// persisted when an error is returned.
    async fn append(&self, message: NewMessage, now: OffsetDateTime, room_limit: usize) -> Result<Message>;

    /// Messages in `room_id` with `expires_at > now`, ascending by `created_at` then insertion order.
    async fn list_by_room(&self, room_id: &str, now: OffsetDateTime) -> Result<Vec<Message>>;

    /// Removes every message with `expires_at <= now` across all rooms.
    async fn sweep_expired(&self, now: OffsetDateTime) -> Result<u64>;

    /// Keeps only the newest `limit` messages of each room.
    async fn prune_overflow(&self, limit: usize) -> Result<u64>;

    /// Messages physically held for `room_id`, including expired ones not yet swept.
    async fn count_in_room(&self, room_id: &str) -> Result<u64>;

    /// Cheap liveness check for readiness probes.
    async fn ping(&self) -> Result<()>;
}
