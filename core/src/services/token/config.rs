//! Configuration for the token lifecycle manager

use chrono::Duration;
use gp_shared::config::auth::{
    AuthConfig, DEFAULT_ADMIN_ROLE_ID, DEFAULT_ID_TOKEN_EXPIRY_SECONDS,
    DEFAULT_REFRESH_TOKEN_EXPIRY_SECONDS,
};

use crate::errors::DomainError;

/// Longest accepted token lifetime (10 years)
pub const MAX_TOKEN_EXPIRY_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Configuration for the token lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLifecycleConfig {
    /// Identity token expiry in seconds
    pub id_token_expiry_seconds: i64,
    /// Refresh token expiry in seconds
    pub refresh_token_expiry_seconds: i64,
    /// Role id granting administrator access
    pub admin_role_id: u32,
    /// Clock skew tolerated on expiry checks, in seconds
    pub leeway_seconds: u64,
}

impl Default for TokenLifecycleConfig {
    fn default() -> Self {
        Self {
            id_token_expiry_seconds: DEFAULT_ID_TOKEN_EXPIRY_SECONDS,
            refresh_token_expiry_seconds: DEFAULT_REFRESH_TOKEN_EXPIRY_SECONDS,
            admin_role_id: DEFAULT_ADMIN_ROLE_ID,
            leeway_seconds: 0,
        }
    }
}

impl From<&AuthConfig> for TokenLifecycleConfig {
    fn from(auth: &AuthConfig) -> Self {
        Self {
            id_token_expiry_seconds: auth.id_token_expiry,
            refresh_token_expiry_seconds: auth.refresh_token_expiry,
            admin_role_id: auth.admin_role_id,
            leeway_seconds: auth.leeway_seconds,
        }
    }
}

impl TokenLifecycleConfig {
    pub fn id_token_ttl(&self) -> Duration {
        Duration::seconds(self.id_token_expiry_seconds)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_token_expiry_seconds)
    }

    /// Rejects lifetimes that would mint already-expired tokens or overflow
    /// the expiry timestamp
    pub fn validate(&self) -> Result<(), DomainError> {
        check_expiry("identity", self.id_token_expiry_seconds)?;
        check_expiry("refresh", self.refresh_token_expiry_seconds)
    }
}

fn check_expiry(token: &str, seconds: i64) -> Result<(), DomainError> {
    if seconds <= 0 || seconds > MAX_TOKEN_EXPIRY_SECONDS {
        return Err(DomainError::Config {
            message: format!(
                "{} token expiry must be between 1 and {} seconds, got {}",
                token, MAX_TOKEN_EXPIRY_SECONDS, seconds
            ),
        });
    }
    Ok(())
}
