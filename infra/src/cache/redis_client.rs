//! Redis cache client implementation
//!
//! This module provides a Redis client over a multiplexed connection. Only
//! connection bootstrap is retried: commands such as `INCR` are not
//! idempotent, so every command is sent exactly once and failures are
//! returned to the caller.

use redis::{aio::MultiplexedConnection, AsyncCommands, Client, ErrorKind, RedisError};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::cache::CacheConfig;
use crate::InfrastructureError;

/// Cap on the delay between connection attempts
const MAX_RETRY_DELAY_MS: u64 = 5000;

/// Redis client with connection retry
///
/// Cloning is cheap; clones share the same multiplexed connection.
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
}

impl RedisClient {
    /// Create a new Redis client
    ///
    /// Connection attempts follow `config.connect_retries` and
    /// `config.retry_delay_ms`, doubling the delay after each failure.
    ///
    /// # Example
    /// ```no_run
    /// use vc_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn create_client() -> Result<RedisClient, Box<dyn std::error::Error>> {
    ///     let config = CacheConfig::new("redis://localhost:6379").with_database(1);
    ///     let client = RedisClient::new(config).await?;
    ///     Ok(client)
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        let url = config.connection_url();
        info!(
            "Creating Redis client with URL: {} (connect retries: {})",
            mask_url(&url),
            config.connect_retries
        );

        let client = Client::open(url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(&client, &config).await?;

        info!("Redis client created successfully");

        Ok(Self { connection, config })
    }

    /// Create multiplexed connection with retry logic
    async fn create_connection_with_retry(
        client: &Client,
        config: &CacheConfig,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let max_attempts = config.connect_retries.max(1);
        let connect_timeout = Duration::from_secs(config.connection_timeout.max(1));
        let mut attempts = 0;
        let mut delay = config.retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            let result = match timeout(connect_timeout, client.get_multiplexed_async_connection()).await {
                Ok(result) => result,
                Err(_) => Err(RedisError::from((ErrorKind::IoError, "connection timed out"))),
            };

            match result {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_attempts && is_retriable_error(&e) => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_attempts, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
            }
        }
    }

    /// Configuration this client was created with
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn conn(&self) -> MultiplexedConnection {
        self.connection.clone()
    }

    /// Set a value with expiration time (`SET key value EX seconds`)
    pub async fn set_with_expiry(
        &self,
        key: &str,
        value: &str,
        expiry_seconds: u64,
    ) -> Result<(), InfrastructureError> {
        debug!("Setting key '{}' with expiry {}s", key, expiry_seconds);

        self.conn()
            .set_ex::<_, _, ()>(key, value, expiry_seconds)
            .await
            .map_err(|e| {
                error!("Failed to set key '{}': {}", key, e);
                InfrastructureError::Cache(e)
            })
    }

    /// Get a string value, `None` if the key is absent or expired
    pub async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        debug!("Getting key '{}'", key);

        self.conn()
            .get::<_, Option<String>>(key)
            .await
            .map_err(|e| {
                error!("Failed to get key '{}': {}", key, e);
                InfrastructureError::Cache(e)
            })
    }

    /// Delete a key, returning whether it existed
    pub async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        debug!("Deleting key '{}'", key);

        let deleted = self.conn().del::<_, u32>(key).await.map_err(|e| {
            error!("Failed to delete key '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })?;
        Ok(deleted > 0)
    }

    /// Get time-to-live for a key
    ///
    /// Returns `None` if the key doesn't exist or has no expiry.
    pub async fn ttl(&self, key: &str) -> Result<Option<u64>, InfrastructureError> {
        debug!("Getting TTL for key '{}'", key);

        let ttl = self.conn().ttl::<_, i64>(key).await.map_err(|e| {
            error!("Failed to get TTL for key '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })?;

        match ttl {
            -1 => {
                debug!("Key '{}' exists but has no expiry", key);
                Ok(None)
            }
            ttl if ttl < 0 => Ok(None),
            ttl => Ok(u64::try_from(ttl).ok()),
        }
    }

    /// Increment a counter (`INCR`), creating it at 1 without expiry
    pub async fn increment(&self, key: &str) -> Result<i64, InfrastructureError> {
        debug!("Incrementing counter '{}'", key);

        let count = self.conn().incr::<_, _, i64>(key, 1).await.map_err(|e| {
            error!("Failed to increment counter '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })?;

        debug!("Counter '{}' incremented to {}", key, count);
        Ok(count)
    }

    /// Expire a key at a unix timestamp (`EXPIREAT`)
    ///
    /// Returns whether the key existed.
    pub async fn expire_at(&self, key: &str, unix_seconds: i64) -> Result<bool, InfrastructureError> {
        debug!("Setting key '{}' to expire at {}", key, unix_seconds);

        let updated = redis::cmd("EXPIREAT")
            .arg(key)
            .arg(unix_seconds)
            .query_async::<_, i64>(&mut self.conn())
            .await
            .map_err(|e| {
                error!("Failed to set expiry on key '{}': {}", key, e);
                InfrastructureError::Cache(e)
            })?;
        Ok(updated == 1)
    }

    /// Add a member to a set (`SADD`)
    pub async fn set_add(&self, key: &str, member: &str) -> Result<(), InfrastructureError> {
        debug!("Adding member to set '{}'", key);

        self.conn()
            .sadd::<_, _, i64>(key, member)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to add member to set '{}': {}", key, e);
                InfrastructureError::Cache(e)
            })
    }

    /// Remove a member from a set (`SREM`)
    pub async fn set_remove(&self, key: &str, member: &str) -> Result<(), InfrastructureError> {
        debug!("Removing member from set '{}'", key);

        self.conn()
            .srem::<_, _, i64>(key, member)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!("Failed to remove member from set '{}': {}", key, e);
                InfrastructureError::Cache(e)
            })
    }

    /// Number of members in a set (`SCARD`), 0 if absent
    pub async fn set_cardinality(&self, key: &str) -> Result<u64, InfrastructureError> {
        debug!("Counting members of set '{}'", key);

        self.conn().scard::<_, u64>(key).await.map_err(|e| {
            error!("Failed to count members of set '{}': {}", key, e);
            InfrastructureError::Cache(e)
        })
    }

    /// Check if the Redis connection is healthy
    ///
    /// Performs a PING command to verify connectivity.
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let response = redis::cmd("PING")
            .query_async::<_, String>(&mut self.conn())
            .await
            .map_err(|e| {
                error!("Redis health check failed: {}", e);
                InfrastructureError::Cache(e)
            })?;

        if response == "PONG" {
            debug!("Redis health check passed");
            Ok(true)
        } else {
            warn!("Redis health check returned unexpected response: {}", response);
            Ok(false)
        }
    }
}

/// Check if a Redis error is transient
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        ErrorKind::IoError | ErrorKind::BusyLoadingError | ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let (Some(at_pos), Some(proto_end)) = (url.rfind('@'), url.find("://")) {
        if at_pos > proto_end {
            return format!("{}****{}", &url[..proto_end + 3], &url[at_pos..]);
        }
    }
    url.to_string()
}
