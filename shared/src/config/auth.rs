//! Authentication and authorization configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Default identity token lifetime (30 minutes)
pub const DEFAULT_ID_TOKEN_EXPIRY_SECONDS: i64 = 1800;

/// Default refresh token lifetime (3 days)
pub const DEFAULT_REFRESH_TOKEN_EXPIRY_SECONDS: i64 = 259_200;

/// Role id carried by administrator accounts
pub const DEFAULT_ADMIN_ROLE_ID: u32 = 1;

/// Locations of the signing keys and the refresh secret
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeyConfig {
    /// PEM-encoded RSA private key used to sign identity tokens
    pub private_key_path: String,

    /// PEM-encoded RSA public key used to verify identity tokens
    pub public_key_path: String,

    /// Shared secret for refresh tokens; generated at startup when absent
    #[serde(default, skip_serializing)]
    pub refresh_secret: Option<String>,

    /// Generate an RSA keypair when both key files are missing
    #[serde(default = "default_generate_if_missing")]
    pub generate_if_missing: bool,

    /// Modulus size for generated keys
    #[serde(default = "default_rsa_bits")]
    pub rsa_bits: usize,
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self {
            private_key_path: String::from("keys/jwt_private_key.pem"),
            public_key_path: String::from("keys/jwt_public_key.pem"),
            refresh_secret: None,
            generate_if_missing: default_generate_if_missing(),
            rsa_bits: default_rsa_bits(),
        }
    }
}

impl KeyConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            private_key_path: std::env::var("PRIV_KEY_FILE")
                .unwrap_or(defaults.private_key_path),
            public_key_path: std::env::var("PUB_KEY_FILE")
                .unwrap_or(defaults.public_key_path),
            refresh_secret: std::env::var("REFRESH_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty()),
            generate_if_missing: env_or("GENERATE_KEYS_IF_MISSING", defaults.generate_if_missing),
            rsa_bits: env_or("RSA_KEY_BITS", defaults.rsa_bits),
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Key material configuration
    pub keys: KeyConfig,

    /// Identity token expiry time in seconds
    pub id_token_expiry: i64,

    /// Refresh token expiry time in seconds
    pub refresh_token_expiry: i64,

    /// Role id that grants administrator access
    #[serde(default = "default_admin_role_id")]
    pub admin_role_id: u32,

    /// Clock skew tolerated when checking expiry, in seconds
    #[serde(default)]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            keys: KeyConfig::default(),
            id_token_expiry: DEFAULT_ID_TOKEN_EXPIRY_SECONDS,
            refresh_token_expiry: DEFAULT_REFRESH_TOKEN_EXPIRY_SECONDS,
            admin_role_id: DEFAULT_ADMIN_ROLE_ID,
            leeway_seconds: 0,
        }
    }
}

impl AuthConfig {
    /// Create from environment variables
    ///
    /// Lifetimes come from `ID_TOKEN_EXP_SECONDS` and
    /// `REFRESH_TOKEN_EXP_SECONDS`. The older `ID_TOKEN_EXP` and
    /// `REFRESH_TOKEN_EXP` are still honoured, in hours, when the new names
    /// are unset.
    pub fn from_env() -> Self {
        Self {
            keys: KeyConfig::from_env(),
            id_token_expiry: expiry_from_env(
                "ID_TOKEN_EXP_SECONDS",
                "ID_TOKEN_EXP",
                DEFAULT_ID_TOKEN_EXPIRY_SECONDS,
            ),
            refresh_token_expiry: expiry_from_env(
                "REFRESH_TOKEN_EXP_SECONDS",
                "REFRESH_TOKEN_EXP",
                DEFAULT_REFRESH_TOKEN_EXPIRY_SECONDS,
            ),
            admin_role_id: env_or("ADMIN_ROLE_ID", DEFAULT_ADMIN_ROLE_ID),
            leeway_seconds: env_or("JWT_LEEWAY_SECONDS", 0),
        }
    }

    /// Set identity token expiry in minutes
    pub fn with_id_expiry_minutes(mut self, minutes: i64) -> Self {
        self.id_token_expiry = minutes * 60;
        self
    }

    /// Set refresh token expiry in days
    pub fn with_refresh_expiry_days(mut self, days: i64) -> Self {
        self.refresh_token_expiry = days * 86400;
        self
    }

    /// Whether the refresh secret will be generated at startup
    pub fn is_using_ephemeral_secret(&self) -> bool {
        self.keys.refresh_secret.is_none()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env_parsed(name).unwrap_or(default)
}

fn env_parsed<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

fn expiry_from_env(seconds_var: &str, legacy_hours_var: &str, default: i64) -> i64 {
    resolve_expiry(env_parsed(seconds_var), env_parsed(legacy_hours_var), default)
}

/// Picks a lifetime in seconds, preferring an explicit seconds value over a
/// legacy hours value. Overflowing hour counts saturate so that validation
/// rejects them.
fn resolve_expiry(seconds: Option<i64>, legacy_hours: Option<i64>, default: i64) -> i64 {
    seconds
        .or_else(|| legacy_hours.map(|hours| hours.saturating_mul(3600)))
        .unwrap_or(default)
}

fn default_generate_if_missing() -> bool {
    true
}

fn default_rsa_bits() -> usize {
    2048
}

fn default_admin_role_id() -> u32 {
    DEFAULT_ADMIN_ROLE_ID
}
