//! Application settings and configuration structures.

use std::collections::HashSet;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Largest body the 16-bit length field can describe.
pub const MAX_WIRE_BODY_LEN: usize = u16::MAX as usize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Which service this process runs
    pub role: ServiceRole,

    /// HTTP binding for the gateway and directory roles
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration (token and counter store)
    pub redis: RedisSettings,

    /// Health-check cadence shared by every resource pool
    pub pool: PoolSettings,

    /// Directory service endpoint and chat server list
    pub directory: DirectorySettings,

    /// TCP chat server configuration
    pub chat: ChatSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// The three services this binary can run as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceRole {
    Gateway,
    Directory,
    Chat,
}

impl std::fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceRole::Gateway => write!(f, "gateway"),
            ServiceRole::Directory => write!(f, "directory"),
            ServiceRole::Chat => write!(f, "chat"),
        }
    }
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Fixed number of pooled connections
    pub pool_size: u32,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Fixed number of pooled connections
    pub pool_size: u32,
}

/// Resource pool health-check configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSettings {
    /// Idle resources unused for at least this long are probed
    pub staleness_secs: u64,

    /// Seconds between health-check cycles
    pub check_interval_secs: u64,
}

/// One chat server as known to the directory.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ChatServerEntry {
    pub name: String,
    pub host: String,
    pub port: u16,
}

/// Directory service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectorySettings {
    /// Base URL of the directory RPC service (consumed by gateway and chat roles)
    pub url: String,

    /// Number of pooled RPC stubs
    pub pool_size: u32,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Known chat servers, in selection order
    pub servers: Vec<ChatServerEntry>,
}

/// TCP chat server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    /// Name under which this server reports its load
    pub name: String,

    /// Address to bind the TCP listener to
    pub host: String,

    /// TCP port
    pub port: u16,

    /// Number of I/O worker threads
    pub workers: usize,

    /// Maximum accepted frame body in bytes
    pub max_body_len: usize,

    /// Maximum queued outbound frames per session
    pub max_send_queue: usize,

    /// Sessions silent for longer than this are expired
    pub heartbeat_timeout_secs: u64,

    /// Longest one outbound write, or the flush after a close, may block
    pub write_timeout_secs: u64,

    /// Seconds between heartbeat sweeps
    pub sweep_interval_secs: u64,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. config/default.toml (base configuration)
    /// 2. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 3. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if a value fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        // Determine the running environment
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("role", "gateway")?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "postgres://localhost/chat")?
            .set_default("database.pool_size", 5)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.pool_size", 5)?
            .set_default("pool.staleness_secs", 5)?
            .set_default("pool.check_interval_secs", 60)?
            .set_default("directory.url", "http://127.0.0.1:50052")?
            .set_default("directory.pool_size", 5)?
            .set_default("directory.request_timeout_secs", 5)?
            .set_default("directory.servers", Vec::<String>::new())?
            .set_default("chat.name", "chatserver1")?
            .set_default("chat.host", "0.0.0.0")?
            .set_default("chat.port", 8090)?
            .set_default("chat.workers", 4)?
            .set_default("chat.max_body_len", 2048)?
            .set_default("chat.max_send_queue", 1000)?
            .set_default("chat.heartbeat_timeout_secs", 60)?
            .set_default("chat.write_timeout_secs", 5)?
            .set_default("chat.sweep_interval_secs", 60)?
            // Load from config files
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Load from environment variables
            // APP__CHAT__PORT=8090 -> chat.port = 8090
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            // Map simple environment variables
            .set_override_option("role", std::env::var("SERVER_ROLE").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .set_override_option("directory.url", std::env::var("DIRECTORY_URL").ok())?
            .set_override_option("chat.name", std::env::var("CHAT_SERVER_NAME").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Reject configurations the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chat.max_body_len == 0 || self.chat.max_body_len > MAX_WIRE_BODY_LEN {
            return Err(ConfigError::Message(format!(
                "chat.max_body_len must be between 1 and {}, got {}",
                MAX_WIRE_BODY_LEN, self.chat.max_body_len
            )));
        }
        if self.chat.workers == 0 || self.chat.max_send_queue == 0 || self.chat.write_timeout_secs == 0
        {
            return Err(ConfigError::Message(
                "chat.workers, chat.max_send_queue and chat.write_timeout_secs must be non-zero"
                    .into(),
            ));
        }
        if self.database.pool_size == 0 || self.redis.pool_size == 0 || self.directory.pool_size == 0
        {
            return Err(ConfigError::Message("pool sizes must be non-zero".into()));
        }

        let mut names = HashSet::new();
        for server in &self.directory.servers {
            if !names.insert(server.name.as_str()) {
                return Err(ConfigError::Message(format!(
                    "duplicate chat server name in directory.servers: {}",
                    server.name
                )));
            }
        }
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl PoolSettings {
    pub fn staleness(&self) -> Duration {
        Duration::from_secs(self.staleness_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }
}

impl ChatSettings {
    /// Address the TCP listener binds to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl DirectorySettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
