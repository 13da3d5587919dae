//! Token entities for identity/refresh token authentication.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::AccountIdentity;

/// Claims of a short-lived identity token (RS256)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    /// Account snapshot at signing time
    pub account: AccountIdentity,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl IdentityClaims {
    /// Creates identity claims valid for `ttl` from now
    ///
    /// Returns `None` when the expiry is not representable.
    pub fn new(account: AccountIdentity, ttl: Duration) -> Option<Self> {
        let now = Utc::now();
        Some(Self {
            account,
            iat: now.timestamp(),
            exp: now.checked_add_signed(ttl)?.timestamp(),
        })
    }
}

/// Claims of a refresh token (HS256)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// Account the session belongs to
    pub account_id: Uuid,

    /// Role id at signing time
    pub role_id: u32,

    /// Token id, also the session record id
    pub jti: Uuid,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,
}

impl RefreshClaims {
    /// Creates refresh claims with a fresh random token id
    ///
    /// Returns `None` when the expiry is not representable.
    pub fn new(account_id: Uuid, role_id: u32, ttl: Duration) -> Option<Self> {
        let now = Utc::now();
        Some(Self {
            account_id,
            role_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: now.checked_add_signed(ttl)?.timestamp(),
        })
    }
}

/// The two kinds of token the service signs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identity,
    Refresh,
}

/// Claims that passed signature verification, tagged by token kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedClaims {
    Identity(IdentityClaims),
    Refresh(RefreshClaims),
}

impl VerifiedClaims {
    /// Role id embedded in the claims
    pub fn role_id(&self) -> u32 {
        match self {
            VerifiedClaims::Identity(claims) => claims.account.role_id,
            VerifiedClaims::Refresh(claims) => claims.role_id,
        }
    }

    /// Expiration timestamp
    pub fn expires_at(&self) -> i64 {
        match self {
            VerifiedClaims::Identity(claims) => claims.exp,
            VerifiedClaims::Refresh(claims) => claims.exp,
        }
    }

    /// A token is usable only while `now < exp + leeway`
    pub fn is_expired_at(&self, now: i64, leeway_seconds: u64) -> bool {
        let leeway = i64::try_from(leeway_seconds).unwrap_or(i64::MAX);
        now >= self.expires_at().saturating_add(leeway)
    }

    pub fn into_identity(self) -> Option<IdentityClaims> {
        match self {
            VerifiedClaims::Identity(claims) => Some(claims),
            VerifiedClaims::Refresh(_) => None,
        }
    }

    pub fn into_refresh(self) -> Option<RefreshClaims> {
        match self {
            VerifiedClaims::Refresh(claims) => Some(claims),
            VerifiedClaims::Identity(_) => None,
        }
    }
}

/// A freshly signed refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRefreshToken {
    /// Compact JWT
    pub signed_string: String,

    /// Token id
    pub id: Uuid,

    /// Time left until expiry, used as the session record TTL
    pub expires_in: std::time::Duration,
}

/// A refresh token that passed codec-level validation
///
/// Holding one does not mean the session is still live: revocation is only
/// detected when the token is rotated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenSession {
    pub signed_string: String,
    pub id: Uuid,
    pub account_id: Uuid,
    pub role_id: u32,
}

impl From<(String, RefreshClaims)> for RefreshTokenSession {
    fn from((signed_string, claims): (String, RefreshClaims)) -> Self {
        Self {
            signed_string,
            id: claims.jti,
            account_id: claims.account_id,
            role_id: claims.role_id,
        }
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// RS256 identity token
    pub identity_token: String,

    /// HS256 refresh token
    pub refresh_token: String,

    /// Session id of the refresh token
    #[serde(skip)]
    pub refresh_token_id: Uuid,

    /// Account the pair was issued to
    #[serde(skip)]
    pub account_id: Uuid,

    /// Identity token expiry time in seconds
    pub identity_expires_in: i64,

    /// Refresh token expiry time in seconds
    pub refresh_expires_in: i64,
}

/// Session record key: `{account_id}:{token_id}`
pub fn session_key(account_id: Uuid, token_id: Uuid) -> String {
    format!("{}:{}", account_id, token_id)
}

/// Prefix shared by every session record of an account
pub fn account_key_prefix(account_id: Uuid) -> String {
    format!("{}:", account_id)
}
