//! # Infrastructure Layer
//!
//! Concrete implementations behind the token lifecycle domain layer.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Cache**: Redis client and the Redis-backed `SessionStore`
//! - **Telemetry**: tracing subscriber setup
//! - **Bootstrap**: configuration loading and manager construction

use std::sync::Arc;

use gp_core::errors::DomainError;
use gp_core::services::token::{KeyMaterial, TokenLifecycleConfig, TokenLifecycleManager};
use gp_shared::config::{AppConfig, Environment};
use tracing::{info, warn};

/// Cache module - Redis client and session store
pub mod cache;

/// Telemetry module - tracing subscriber setup
pub mod telemetry;

use cache::{RedisClient, RedisSessionStore};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Redis did not answer within the response timeout
    #[error("Cache operation timed out")]
    Timeout,

    /// The session store was closed
    #[error("Session store is closed")]
    Closed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error raised while building domain services
    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Load application configuration from the environment
///
/// Reads `.env.{environment}` when present, falling back to `.env`. Variables
/// already set in the process environment win.
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    let environment = Environment::from_env();
    if dotenvy::from_filename(environment.env_file()).is_err() {
        dotenvy::dotenv().ok(); // Load .env file if present
    }

    let config = AppConfig::from_env();
    TokenLifecycleConfig::from(&config.auth).validate()?;

    if config.auth.is_using_ephemeral_secret() {
        warn!("No REFRESH_SECRET configured for the {} environment", config.environment);
    }
    Ok(config)
}

/// Build a token lifecycle manager backed by Redis
///
/// Loads (or generates) key material, connects to Redis and checks that the
/// server answers before returning.
pub async fn build_token_manager(
    config: &AppConfig,
) -> Result<TokenLifecycleManager<RedisSessionStore>, InfrastructureError> {
    info!("Initializing token lifecycle manager...");

    let keys = Arc::new(KeyMaterial::load(&config.auth.keys)?);

    let client = RedisClient::new(config.cache.clone()).await?;
    if !client.health_check().await? {
        return Err(InfrastructureError::Config(
            "Redis health check returned an unexpected response".to_string(),
        ));
    }

    let manager = TokenLifecycleManager::new(
        RedisSessionStore::new(client),
        keys,
        TokenLifecycleConfig::from(&config.auth),
    )?;

    info!("Token lifecycle manager initialized successfully");
    Ok(manager)
}
