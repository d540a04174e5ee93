use crate::adapters::MessageStore;
use crate::config::MessagingConfig;
use crate::domain::clock::Clock;
use crate::domain::message::{NewMessage, PostedMessage, RevealedMessage};
use crate::domain::room::{RoomId, SenderFingerprint, SessionToken};
use crate::error::{AppError, Result};
use crate::services::codec::{ContentCodec, DecodeError};
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};
use std::sync::Arc;
use time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct Metrics {
    pub(crate) posted_total: Counter<u64>,
    pub(crate) decode_failures_total: Counter<u64>,
    pub(crate) read_batch_size: Histogram<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("haven-relay");
        Self {
            posted_total: meter
                .u64_counter("haven_messages_posted_total")
                .with_description("Total room messages posted")
                .build(),
            decode_failures_total: meter
                .u64_counter("haven_message_decode_failures_total")
                .with_description("Messages omitted from a read because they could not be revealed")
                .build(),
            read_batch_size: meter
                .u64_histogram("haven_message_read_batch_size")
                .with_description("Number of messages revealed in a single room read")
                .build(),
        }
    }
}

/// Post and read operations for rooms, layered over a store and a codec.
#[derive(Clone, Debug)]
pub struct MessageService {
    store: Arc<dyn MessageStore>,
    codec: Arc<dyn ContentCodec>,
    clock: Arc<dyn Clock>,
    config: MessagingConfig,
    metrics: Metrics,
}

impl MessageService {
    #[must_use]
    pub fn new(
        store: Arc<dyn MessageStore>,
        codec: Arc<dyn ContentCodec>,
        clock: Arc<dyn Clock>,
        config: MessagingConfig,
    ) -> Self {
        Self { store, codec, clock, config, metrics: Metrics::new() }
    }

    /// Protects `plaintext` under `token` and stores it in `room_id`.
    ///
    /// A missing `ttl_minutes` uses the configured default; values above the configured cap are
    /// clamped to it. The room keeps at most `max_room_messages`, oldest dropped first.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for a blank room id, empty or oversized content, or a
    /// non-positive lifetime. Returns a storage error if the message could not be persisted.
    #[tracing::instrument(
        err(level = "debug"),
        skip(self, plaintext, token),
        fields(room_id = %room_id, ttl_minutes = tracing::field::Empty)
    )]
    pub async fn post(
        &self,
        room_id: &str,
        plaintext: &str,
        ttl_minutes: Option<i64>,
        token: &SessionToken,
    ) -> Result<PostedMessage> {
        let room_id = RoomId::parse(room_id, self.config.max_room_id_len)?;

        if plaintext.is_empty() {
            return Err(AppError::BadRequest("content must not be empty".into()));
        }
        if plaintext.len() > self.config.max_content_bytes {
            return Err(AppError::BadRequest(format!(
                "content must be at most {} bytes",
                self.config.max_content_bytes
            )));
        }

        let ttl = self.resolve_ttl(ttl_minutes)?;
        tracing::Span::current().record("ttl_minutes", ttl.whole_minutes());

        let new_message = NewMessage {
            sender_fingerprint: SenderFingerprint::derive(token, &room_id),
            stored_content: self.codec.protect(plaintext, token)?,
            room_id,
            ttl,
        };

        match self.store.append(new_message, self.clock.now(), self.config.max_room_messages).await {
            Ok(message) => {
                tracing::debug!(message_id = %message.id, "Message stored");
                self.metrics.posted_total.add(1, &[KeyValue::new("status", "success")]);
                Ok(message.into())
            }
            Err(e) => {
                self.metrics.posted_total.add(1, &[KeyValue::new("status", "failure")]);
                Err(e)
            }
        }
    }

    /// Reads the live messages of `room_id`, attempting to reveal each one under `token`.
    ///
    /// The per-message outcomes are returned in store order so callers decide what to do with
    /// failures.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for an invalid room id, or a storage error.
    #[tracing::instrument(err(level = "debug"), skip(self, token), fields(room_id = %room_id))]
    pub async fn read_outcomes(
        &self,
        room_id: &str,
        token: &SessionToken,
    ) -> Result<Vec<std::result::Result<RevealedMessage, DecodeError>>> {
        let room_id = RoomId::parse(room_id, self.config.max_room_id_len)?;
        let messages = self.store.list_by_room(room_id.as_str(), self.clock.now()).await?;

        Ok(messages
            .into_iter()
            .map(|message| -> std::result::Result<RevealedMessage, DecodeError> {
                let plaintext = self.codec.reveal(&message.stored_content, token)?;
                Ok(RevealedMessage {
                    id: message.id,
                    plaintext,
                    sender_fingerprint: message.sender_fingerprint,
                    created_at: message.created_at,
                    expires_at: message.expires_at,
                })
            })
            .collect())
    }

    /// Reads `room_id` and keeps only the messages `token` can reveal.
    ///
    /// A message that fails to reveal is dropped from the result; it never fails the read.
    ///
    /// # Errors
    /// Returns `AppError::BadRequest` for an invalid room id, or a storage error.
    pub async fn read(&self, room_id: &str, token: &SessionToken) -> Result<Vec<RevealedMessage>> {
        let outcomes = self.read_outcomes(room_id, token).await?;

        let mut revealed = Vec::with_capacity(outcomes.len());
        let mut omitted = 0u64;
        for outcome in outcomes {
            match outcome {
                Ok(message) => revealed.push(message),
                Err(e) => {
                    tracing::trace!(reason = %e, "Omitting message that cannot be revealed");
                    omitted += 1;
                }
            }
        }

        if omitted > 0 {
            tracing::debug!(omitted, "Omitted messages not readable under this session");
            self.metrics.decode_failures_total.add(omitted, &[]);
        }
        self.metrics.read_batch_size.record(revealed.len() as u64, &[]);

        Ok(revealed)
    }

    fn resolve_ttl(&self, ttl_minutes: Option<i64>) -> Result<Duration> {
        let minutes = ttl_minutes.unwrap_or(self.config.default_ttl_minutes);
        if minutes <= 0 {
            return Err(AppError::BadRequest("expiresInMinutes must be positive".into()));
        }
        if minutes > self.config.max_ttl_minutes {
            tracing::debug!(requested = minutes, cap = self.config.max_ttl_minutes, "Clamping message lifetime");
        }
        Ok(Duration::minutes(minutes.min(self.config.max_ttl_minutes)))
    }
}
