#![allow(dead_code)]
use haven_relay::adapters::MessageStore;
use haven_relay::adapters::memory::InMemoryMessageStore;
use haven_relay::api::MgmtState;
use haven_relay::config::{
    CodecKind, Config, DatabaseConfig, LogFormat, MessagingConfig, RateLimitConfig, ServerConfig, TelemetryConfig,
};
use haven_relay::domain::clock::{Clock, ManualClock};
use haven_relay::workers::MessageCleanupWorker;
use haven_relay::{AppBuilder, Workers};
use reqwest::Client;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Once};
use tokio::net::TcpListener;
use tokio::sync::watch;
use uuid::Uuid;

static INIT: Once = Once::new();

pub fn setup_tracing() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "warn".into())
            .add_directive("haven_relay=debug".parse().unwrap())
            .add_directive("sqlx=warn".parse().unwrap())
            .add_directive("tower=warn".parse().unwrap())
            .add_directive("hyper=warn".parse().unwrap())
            .add_directive("reqwest=warn".parse().unwrap());

        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}

pub fn get_test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            mgmt_port: 0,
            shutdown_timeout_secs: 5,
            health_timeout_ms: 2000,
            trusted_proxies: vec!["127.0.0.1/32".parse().unwrap(), "::1/128".parse().unwrap()],
        },
        database: DatabaseConfig { url: None, max_connections: 5, acquire_timeout_secs: 5 },
        messaging: MessagingConfig {
            default_ttl_minutes: 60,
            max_ttl_minutes: 1440,
            // Tests drive cleanup explicitly.
            cleanup_interval_secs: 0,
            max_room_messages: 500,
            max_content_bytes: 8192,
            max_room_id_len: 128,
            codec: CodecKind::Aead,
        },
        rate_limit: RateLimitConfig { per_second: 10000, burst: 10000 },
        telemetry: TelemetryConfig { log_format: LogFormat::Text, otlp_endpoint: None },
    }
}

pub fn new_session() -> String {
    format!("session-{}", Uuid::new_v4())
}

pub fn new_room() -> String {
    format!("room-{}", &Uuid::new_v4().simple().to_string()[..12])
}

pub struct TestApp {
    pub server_url: String,
    pub mgmt_url: String,
    pub client: Client,
    pub config: Config,
    pub store: Arc<dyn MessageStore>,
    pub clock: Arc<ManualClock>,
    pub cleanup: MessageCleanupWorker,
    pub shutdown_tx: watch::Sender<bool>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_config(get_test_config()).await
    }

    pub async fn spawn_with_config(config: Config) -> Self {
        Self::spawn_with_store(config, Arc::new(InMemoryMessageStore::new())).await
    }

    pub async fn spawn_with_store(config: Config, store: Arc<dyn MessageStore>) -> Self {
        setup_tracing();

        let clock = Arc::new(ManualClock::new(time::OffsetDateTime::now_utc()));
        let app = AppBuilder::new(config.clone())
            .with_store(Arc::clone(&store))
            .with_clock(Arc::clone(&clock) as Arc<dyn Clock>)
            .build();

        let app_router = haven_relay::api::app_router(&config, app.services).unwrap();
        let mgmt_router = haven_relay::api::mgmt_router(MgmtState { health_service: app.health_service });

        let api_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mgmt_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server_url = format!("http://{}", api_listener.local_addr().unwrap());
        let mgmt_url = format!("http://{}", mgmt_listener.local_addr().unwrap());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut api_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            axum::serve(api_listener, app_router.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = api_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        let mut mgmt_rx = shutdown_rx;
        tokio::spawn(async move {
            axum::serve(mgmt_listener, mgmt_router.into_make_service_with_connect_info::<SocketAddr>())
                .with_graceful_shutdown(async move {
                    let _ = mgmt_rx.wait_for(|&s| s).await;
                })
                .await
                .unwrap();
        });

        let Workers { message_cleanup } = app.workers;

        Self {
            server_url,
            mgmt_url,
            client: Client::new(),
            config,
            store: app.store,
            clock,
            cleanup: message_cleanup,
            shutdown_tx,
        }
    }

    pub async fn post_message(
        &self,
        session: &str,
        room_id: &str,
        content: &str,
        expires_in_minutes: Option<i64>,
    ) -> reqwest::Response {
        let mut body = json!({ "roomId": room_id, "content": content });
        if let Some(minutes) = expires_in_minutes {
            body["expiresInMinutes"] = json!(minutes);
        }

        self.client
            .post(format!("{}/messages", self.server_url))
            .header("X-Session-ID", session)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn read_room(&self, session: &str, room_id: &str) -> reqwest::Response {
        self.client
            .get(format!("{}/messages/{}", self.server_url, room_id))
            .header("X-Session-ID", session)
            .send()
            .await
            .unwrap()
    }

    pub async fn read_room_json(&self, session: &str, room_id: &str) -> Vec<serde_json::Value> {
        let resp = self.read_room(session, room_id).await;
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        resp.json().await.unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}
