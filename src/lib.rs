#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;
pub mod workers;

use crate::adapters::MessageStore;
use crate::adapters::database::{self, PostgresMessageStore};
use crate::adapters::memory::InMemoryMessageStore;
use crate::api::ServiceContainer;
use crate::config::Config;
use crate::domain::clock::{Clock, MonotonicClock, SystemClock};
use crate::services::codec::build_codec;
use crate::services::health_service::HealthService;
use crate::services::message_service::MessageService;
use crate::services::rate_limit_service::RateLimitService;
use crate::services::token_service::TokenService;
use crate::workers::MessageCleanupWorker;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Background tasks that live for the whole process and stop when the shutdown flag flips.
#[derive(Debug)]
pub struct Workers {
    pub message_cleanup: MessageCleanupWorker,
}

impl Workers {
    #[must_use]
    pub fn spawn_all(self, shutdown_rx: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        vec![tokio::spawn(self.message_cleanup.run(shutdown_rx))]
    }
}

#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub workers: Workers,
    pub store: Arc<dyn MessageStore>,
}

/// Wires the store, codec and clock into services and workers.
#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn MessageStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, store: None, clock: None }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Overrides the time source. It is always wrapped in a `MonotonicClock`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn build(self) -> App {
        let store = self.store.unwrap_or_else(|| Arc::new(InMemoryMessageStore::new()));
        let source = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let clock: Arc<dyn Clock> = Arc::new(MonotonicClock::new(source));
        let codec = build_codec(self.config.messaging.codec);

        let message_service = MessageService::new(
            Arc::clone(&store),
            codec,
            Arc::clone(&clock),
            self.config.messaging.clone(),
        );
        let rate_limit_service = RateLimitService::new(self.config.server.trusted_proxies.clone());
        let health_service = HealthService::new(Arc::clone(&store), self.config.server.health_timeout_ms);

        let workers = Workers {
            message_cleanup: MessageCleanupWorker::new(Arc::clone(&store), clock, self.config.messaging),
        };

        App {
            services: ServiceContainer { message_service, token_service: TokenService::new(), rate_limit_service },
            health_service,
            workers,
            store,
        }
    }
}

/// Opens the configured message store: Postgres when a database URL is set, memory otherwise.
///
/// # Errors
/// Returns an error if the database is unreachable or migrations fail.
pub async fn init_store(config: &Config) -> anyhow::Result<Arc<dyn MessageStore>> {
    if let Some(url) = &config.database.url {
        let pool = database::init_pool(url, &config.database).await?;
        database::run_migrations(&pool).await?;
        tracing::info!("Using Postgres message store");
        Ok(Arc::new(PostgresMessageStore::new(pool)))
    } else {
        tracing::info!("Using in-memory message store");
        Ok(Arc::new(InMemoryMessageStore::new()))
    }
}

/// Flips the shutdown flag on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received, starting graceful shutdown");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through tracing before the default hook runs.
pub fn setup_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "Application panicked");
        default_hook(info);
    }));
}
