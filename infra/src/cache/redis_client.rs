//! Redis client for the session store
//!
//! Wraps a multiplexed connection with connect retries, per-command response
//! timeouts and retry of idempotent commands. Only the three commands the
//! session store needs are exposed: `SET .. PX`, `DEL` and `SCAN`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use redis::{aio::MultiplexedConnection, Client, RedisError, RedisResult};
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use gp_shared::config::CacheConfig;

use crate::InfrastructureError;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis client with connection retry and command timeouts
#[derive(Clone)]
pub struct RedisClient {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this client
    config: CacheConfig,
    /// Maximum number of attempts for retried operations
    max_retries: u32,
    /// Base delay between retries (exponential backoff)
    retry_delay_ms: u64,
}

impl RedisClient {
    /// Connects to the server named in `config`
    ///
    /// # Example
    /// ```no_run
    /// use gp_infra::cache::{CacheConfig, RedisClient};
    ///
    /// async fn create_client() -> Result<RedisClient, gp_infra::InfrastructureError> {
    ///     RedisClient::new(CacheConfig::new("redis://localhost:6379")).await
    /// }
    /// ```
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        Self::new_with_retry_config(config, 3, 100).await
    }

    /// Connects with custom retry parameters
    ///
    /// # Arguments
    /// * `config` - Cache configuration settings
    /// * `max_retries` - Maximum number of attempts
    /// * `retry_delay_ms` - Base delay between attempts in milliseconds
    pub async fn new_with_retry_config(
        config: CacheConfig,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<Self, InfrastructureError> {
        info!("Creating Redis client with URL: {}", mask_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(
            client,
            Duration::from_secs(config.connection_timeout),
            max_retries,
            retry_delay_ms,
        )
        .await?;

        info!("Redis client created successfully");

        Ok(Self {
            connection,
            config,
            max_retries: max_retries.max(1),
            retry_delay_ms,
        })
    }

    async fn create_connection_with_retry(
        client: Client,
        connect_timeout: Duration,
        max_retries: u32,
        retry_delay_ms: u64,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let mut attempts = 0;
        let mut delay = retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            let result = match timeout(connect_timeout, client.get_multiplexed_async_connection()).await {
                Ok(result) => result.map_err(InfrastructureError::Cache),
                Err(_) => Err(InfrastructureError::Timeout),
            };

            match result {
                Ok(connection) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Err(e) if attempts < max_retries => {
                    warn!(
                        "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    // Exponential backoff with cap at 5 seconds
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!("Failed to connect to Redis after {} attempts: {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Sets `key` to `value` with a millisecond expiry (`SET key value PX ms`)
    pub async fn set_with_expiry_ms(
        &self,
        key: &str,
        value: &str,
        expiry_ms: u64,
    ) -> Result<(), InfrastructureError> {
        debug!("Setting key '{}' with expiry {}ms", key, expiry_ms);

        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            let value = value.to_string();

            Box::pin(async move {
                redis::cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("PX")
                    .arg(expiry_ms)
                    .query_async::<_, ()>(&mut conn)
                    .await
            })
        })
        .await
        .map_err(|e| {
            error!("Failed to set key '{}': {}", key, e);
            e
        })
    }

    /// Deletes `key` and returns how many keys were removed
    ///
    /// Never retried: a retry after a lost reply would report 0 for a key
    /// this call actually removed.
    pub async fn delete(&self, key: &str) -> Result<u64, InfrastructureError> {
        debug!("Deleting key '{}'", key);

        let mut conn = self.connection.clone();
        let deleted = self
            .with_timeout(async move {
                redis::cmd("DEL")
                    .arg(key)
                    .query_async::<_, u64>(&mut conn)
                    .await
            })
            .await
            .map_err(|e| {
                error!("Failed to delete key '{}': {}", key, e);
                e
            })?;

        if deleted > 0 {
            debug!("Successfully deleted key '{}'", key);
        } else {
            debug!("Key '{}' was not found", key);
        }
        Ok(deleted)
    }

    /// One `SCAN cursor MATCH pattern COUNT count` round trip
    ///
    /// # Returns
    /// * `Ok((next_cursor, keys))` - `next_cursor` is `0` once the scan is complete
    pub async fn scan(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<(u64, Vec<String>), InfrastructureError> {
        debug!("Scanning '{}' from cursor {}", pattern, cursor);

        self.execute_with_retry(|mut conn| {
            let pattern = pattern.to_string();

            Box::pin(async move {
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query_async::<_, (u64, Vec<String>)>(&mut conn)
                    .await
            })
        })
        .await
        .map_err(|e| {
            error!("Failed to scan '{}': {}", pattern, e);
            e
        })
    }

    /// Check if the Redis connection is healthy
    ///
    /// # Returns
    /// * `Result<bool, InfrastructureError>` - True if the server answered PONG
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        debug!("Performing Redis health check");

        let result = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await;

        match result {
            Ok(response) if response == "PONG" => {
                debug!("Redis health check passed");
                Ok(true)
            }
            Ok(response) => {
                warn!("Redis health check returned unexpected response: {}", response);
                Ok(false)
            }
            Err(e) => {
                error!("Redis health check failed: {}", e);
                Err(e)
            }
        }
    }

    /// Execute an idempotent Redis operation with automatic retry logic
    ///
    /// Every attempt is bounded by the configured response timeout. Timeouts
    /// are not retried.
    async fn execute_with_retry<F, T>(&self, operation: F) -> Result<T, InfrastructureError>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match self.with_timeout(operation(conn)).await {
                Ok(result) => return Ok(result),
                Err(InfrastructureError::Cache(e))
                    if attempts < self.max_retries && is_retriable_error(&e) =>
                {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, self.max_retries, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    // Exponential backoff with cap at 5 seconds
                    delay = (delay * 2).min(5000);
                }
                Err(e) => {
                    error!("Redis operation failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
            }
        }
    }

    async fn with_timeout<T>(
        &self,
        operation: impl Future<Output = RedisResult<T>>,
    ) -> Result<T, InfrastructureError> {
        match timeout(Duration::from_secs(self.config.response_timeout), operation).await {
            Ok(result) => result.map_err(InfrastructureError::Cache),
            Err(_) => Err(InfrastructureError::Timeout),
        }
    }
}

/// Whether a Redis error is transient and the operation may be retried
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::ClientError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask the credentials of a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(proto_end) = url.find("://") {
            if proto_end < at_pos {
                let proto = &url[..proto_end + 3];
                let host_part = &url[at_pos..];
                return format!("{}****{}", proto, host_part);
            }
        }
    }
    url.to_string()
}
