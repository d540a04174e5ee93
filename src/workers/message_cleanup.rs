use crate::adapters::MessageStore;
use crate::config::MessagingConfig;
use crate::domain::clock::Clock;
use crate::error::Result;
use opentelemetry::{global, metrics::Counter};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

#[derive(Clone, Debug)]
struct Metrics {
    expired_purged: Counter<u64>,
    room_overflow: Counter<u64>,
}

impl Metrics {
    fn new() -> Self {
        let meter = global::meter("haven-relay");
        Self {
            expired_purged: meter
                .u64_counter("haven_messages_expired_purged_total")
                .with_description("Total expired messages removed by the sweep")
                .build(),
            room_overflow: meter
                .u64_counter("haven_room_overflow_pruned_total")
                .with_description("Total messages deleted because a room exceeded its ceiling")
                .build(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub expired: u64,
    pub pruned: u64,
}

/// Periodically purges expired messages and enforces the per-room ceiling.
#[derive(Debug)]
pub struct MessageCleanupWorker {
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
    config: MessagingConfig,
    metrics: Metrics,
}

impl MessageCleanupWorker {
    #[must_use]
    pub fn new(store: Arc<dyn MessageStore>, clock: Arc<dyn Clock>, config: MessagingConfig) -> Self {
        Self { store, clock, config, metrics: Metrics::new() }
    }

    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        if self.config.cleanup_interval_secs == 0 {
            tracing::info!("Message cleanup is disabled (interval = 0)");
            return;
        }

        let mut interval = tokio::time::interval(Duration::from_secs(self.config.cleanup_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.perform_cleanup()
                        .instrument(tracing::info_span!("message_cleanup_iteration"))
                        .await
                    {
                        tracing::error!(error = ?e, "Message cleanup iteration failed");
                    }
                }
                res = shutdown.changed() => {
                    if res.is_err() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Message cleanup loop shutting down...");
    }

    /// Runs one sweep of expired messages followed by per-room overflow pruning.
    ///
    /// # Errors
    /// Returns an error if the store fails during either step.
    #[tracing::instrument(
        skip(self),
        err,
        fields(expired_deleted = tracing::field::Empty, overflow_deleted = tracing::field::Empty)
    )]
    pub async fn perform_cleanup(&self) -> Result<CleanupReport> {
        tracing::debug!("Running message cleanup (expiry + room limits)...");

        let expired = self.store.sweep_expired(self.clock.now()).await?;
        if expired > 0 {
            tracing::info!(count = %expired, "Deleted expired messages");
            self.metrics.expired_purged.add(expired, &[]);
            tracing::Span::current().record("expired_deleted", expired);
        }

        let pruned = self.store.prune_overflow(self.config.max_room_messages).await?;
        if pruned > 0 {
            tracing::info!(count = %pruned, "Pruned overflow messages");
            self.metrics.room_overflow.add(pruned, &[]);
            tracing::Span::current().record("overflow_deleted", pruned);
        }

        Ok(CleanupReport { expired, pruned })
    }
}
