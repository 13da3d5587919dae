//! Redis-backed implementation of the session store
//!
//! Each refresh session is a key `{prefix:}{account_id}:{token_id}` holding a
//! placeholder value, expiring with the refresh token.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use gp_core::errors::DomainError;
use gp_core::repositories::session::escape_glob;
use gp_core::repositories::{ScanPage, SessionStore};
use gp_shared::config::CacheConfig;

use super::redis_client::RedisClient;
use crate::InfrastructureError;

const SESSION_VALUE: &str = "0";

/// Session store over a [`RedisClient`]
///
/// `close()` drops the client, releasing its connection once calls already
/// in flight complete.
pub struct RedisSessionStore {
    client: RwLock<Option<RedisClient>>,
    config: CacheConfig,
}

impl RedisSessionStore {
    pub fn new(client: RedisClient) -> Self {
        let config = client.config().clone();
        Self {
            client: RwLock::new(Some(client)),
            config,
        }
    }

    pub async fn is_closed(&self) -> bool {
        self.client.read().await.is_none()
    }

    /// Clones the live client, or fails once the store is closed
    async fn client(&self) -> Result<RedisClient, DomainError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or_else(|| to_domain(InfrastructureError::Closed))
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put(&self, key: &str, ttl: Duration) -> Result<(), DomainError> {
        let client = self.client().await?;

        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        if ttl_ms == 0 {
            return Err(DomainError::internal(format!("invalid ttl for key '{}'", key)));
        }

        let key = self.config.make_key(key);
        client
            .set_with_expiry_ms(&key, SESSION_VALUE, ttl_ms)
            .await
            .map_err(to_domain)
    }

    async fn delete(&self, key: &str) -> Result<u64, DomainError> {
        let client = self.client().await?;

        let key = self.config.make_key(key);
        client.delete(&key).await.map_err(to_domain)
    }

    async fn scan_page(
        &self,
        cursor: u64,
        pattern: &str,
        count: usize,
    ) -> Result<ScanPage, DomainError> {
        let client = self.client().await?;

        let pattern = match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", escape_glob(prefix), pattern),
            None => pattern.to_string(),
        };

        let (next_cursor, keys) = client
            .scan(cursor, &pattern, count)
            .await
            .map_err(to_domain)?;
        debug!("Scan page of '{}' returned {} keys", pattern, keys.len());

        Ok(ScanPage {
            keys: keys
                .iter()
                .map(|key| self.config.strip_key(key).to_string())
                .collect(),
            next_cursor,
        })
    }

    async fn close(&self) -> Result<(), DomainError> {
        if self.client.write().await.take().is_some() {
            info!("Redis session store closed");
        }
        Ok(())
    }

    fn scan_batch_size(&self) -> usize {
        self.config.scan_batch_size.max(1)
    }
}

fn to_domain(err: InfrastructureError) -> DomainError {
    DomainError::internal(format!("session store: {}", err))
}
