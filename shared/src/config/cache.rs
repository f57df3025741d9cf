//! Cache configuration module

use serde::{Deserialize, Serialize};

/// Redis cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout: u64,

    /// Attempts made when establishing the connection
    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    /// Base delay between connection attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Redis database number (0-15)
    #[serde(default)]
    pub database: u8,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: String::from("redis://localhost:6379"),
            connection_timeout: default_connection_timeout(),
            connect_retries: default_connect_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            database: 0,
        }
    }
}

impl CacheConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let connection_timeout = std::env::var("REDIS_CONNECTION_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_connection_timeout);
        let connect_retries = std::env::var("REDIS_CONNECT_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_connect_retries);
        let retry_delay_ms = std::env::var("REDIS_RETRY_DELAY_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_retry_delay_ms);
        let database = std::env::var("REDIS_DATABASE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Self {
            url,
            connection_timeout,
            connect_retries,
            retry_delay_ms,
            database: 0,
        }
        .with_database(database)
    }

    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the database number
    pub fn with_database(mut self, db: u8) -> Self {
        self.database = db.min(15);
        self
    }

    /// Set the connection retry policy
    pub fn with_connect_retries(mut self, retries: u32, delay_ms: u64) -> Self {
        self.connect_retries = retries.max(1);
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Connection URL with the database index applied
    ///
    /// URLs that already name a database (`redis://host:6379/3`) are left as-is.
    pub fn connection_url(&self) -> String {
        let after_scheme = self.url.split_once("://").map(|(_, rest)| rest).unwrap_or(&self.url);
        if self.database == 0 || after_scheme.contains('/') {
            self.url.clone()
        } else {
            format!("{}/{}", self.url.trim_end_matches('/'), self.database)
        }
    }
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_connect_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}
