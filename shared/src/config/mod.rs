//! Configuration module with business-specific sub-modules
//!
//! - `auth` - Key material locations, token lifetimes and the admin role
//! - `cache` - Redis session store configuration
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod environment;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::{AuthConfig, KeyConfig};
pub use cache::CacheConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Session store configuration
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    ///
    /// Keys are never generated implicitly in production; missing key files are a
    /// startup failure.
    pub fn production() -> Self {
        let mut auth = AuthConfig::default();
        auth.keys.generate_if_missing = false;

        Self {
            environment: Environment::Production,
            auth,
            cache: CacheConfig::new("redis://redis:6379"),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from environment
    pub fn from_env() -> Self {
        let environment = Environment::from_env();
        let mut auth = AuthConfig::from_env();
        if environment.is_production() && std::env::var("GENERATE_KEYS_IF_MISSING").is_err() {
            auth.keys.generate_if_missing = false;
        }

        Self {
            environment,
            auth,
            cache: CacheConfig::from_env(),
            logging: LoggingConfig::from_env(environment),
        }
    }
}
