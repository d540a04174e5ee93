use clap::{Args, Parser, ValueEnum};
use ipnetwork::IpNetwork;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    #[command(flatten)]
    pub server: ServerConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub messaging: MessagingConfig,

    #[command(flatten)]
    pub rate_limit: RateLimitConfig,

    #[command(flatten)]
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug, Args)]
pub struct ServerConfig {
    /// Host to listen on
    #[arg(long, env = "HAVEN_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "HAVEN_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Port for the management (health) listener
    #[arg(long, env = "HAVEN_MGMT_PORT", default_value_t = 9090)]
    pub mgmt_port: u16,

    /// Seconds to wait for background tasks during shutdown
    #[arg(long, env = "HAVEN_SHUTDOWN_TIMEOUT_SECS", default_value_t = 5)]
    pub shutdown_timeout_secs: u64,

    /// Milliseconds the readiness probe waits for the message store
    #[arg(long, env = "HAVEN_HEALTH_TIMEOUT_MS", default_value_t = 2000)]
    pub health_timeout_ms: u64,

    /// Comma-separated list of CIDRs to trust for X-Forwarded-For IP extraction
    #[arg(
        long,
        env = "HAVEN_TRUSTED_PROXIES",
        default_value = "10.0.0.0/8,172.16.0.0/12,192.168.0.0/16,127.0.0.1/32",
        value_delimiter = ','
    )]
    pub trusted_proxies: Vec<IpNetwork>,
}

#[derive(Clone, Debug, Args)]
pub struct DatabaseConfig {
    /// Postgres connection URL. When unset, messages live in process memory.
    #[arg(long = "database-url", env = "HAVEN_DATABASE_URL")]
    pub url: Option<String>,

    /// Maximum number of pooled connections
    #[arg(long = "db-max-connections", env = "HAVEN_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[arg(long = "db-acquire-timeout-secs", env = "HAVEN_DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 5)]
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CodecKind {
    /// AES-256-GCM with a key derived from the session token
    #[default]
    Aead,
    /// Unauthenticated keystream transform; wrong keys yield garbage rather than errors
    Legacy,
}

#[derive(Clone, Debug, Args)]
pub struct MessagingConfig {
    /// Lifetime applied when a message is posted without `expiresInMinutes`
    #[arg(long, env = "HAVEN_DEFAULT_TTL_MINUTES", default_value_t = 60)]
    pub default_ttl_minutes: i64,

    /// Upper bound for a requested lifetime; longer requests are clamped
    #[arg(long, env = "HAVEN_MAX_TTL_MINUTES", default_value_t = 1440)]
    pub max_ttl_minutes: i64,

    /// How often to run the expired-message sweep
    #[arg(long, env = "HAVEN_CLEANUP_INTERVAL_SECS", default_value_t = 300)]
    pub cleanup_interval_secs: u64,

    /// Maximum number of messages retained per room; the oldest are pruned
    #[arg(long, env = "HAVEN_MAX_ROOM_MESSAGES", default_value_t = 500)]
    pub max_room_messages: usize,

    /// Maximum plaintext size in bytes
    #[arg(long, env = "HAVEN_MAX_CONTENT_BYTES", default_value_t = 8192)]
    pub max_content_bytes: usize,

    /// Maximum room identifier length in characters
    #[arg(long, env = "HAVEN_MAX_ROOM_ID_LEN", default_value_t = 128)]
    pub max_room_id_len: usize,

    /// Content protection scheme for stored messages
    #[arg(long, env = "HAVEN_CODEC", value_enum, default_value_t = CodecKind::Aead)]
    pub codec: CodecKind,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: 60,
            max_ttl_minutes: 1440,
            cleanup_interval_secs: 300,
            max_room_messages: 500,
            max_content_bytes: 8192,
            max_room_id_len: 128,
            codec: CodecKind::Aead,
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct RateLimitConfig {
    /// Requests per second allowed per client IP
    #[arg(long = "rate-limit-per-second", env = "HAVEN_RATE_LIMIT_PER_SECOND", default_value_t = 10)]
    pub per_second: u32,

    /// Burst allowance per client IP
    #[arg(long = "rate-limit-burst", env = "HAVEN_RATE_LIMIT_BURST", default_value_t = 20)]
    pub burst: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, Args)]
pub struct TelemetryConfig {
    /// Log output format
    #[arg(long, env = "HAVEN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OTLP collector endpoint (gRPC). Tracing and metrics export is disabled when unset.
    #[arg(long, env = "HAVEN_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,
}

impl Config {
    #[must_use]
    pub fn load() -> Self {
        Self::parse()
    }
}
