//! Signing and verification of identity and refresh tokens
//!
//! Identity tokens are RS256 JWTs carrying an [`AccountIdentity`] snapshot.
//! Refresh tokens are HS256 JWTs carrying the account id, role id and a token
//! id that names the session record.

use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use crate::domain::entities::{
    AccountIdentity, IdentityClaims, RefreshClaims, SignedRefreshToken, TokenKind, VerifiedClaims,
};
use crate::errors::TokenError;

use super::key_manager::KeyMaterial;

/// Role a token must carry to be accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Any role
    Any,
    /// Only the configured administrator role
    Admin,
}

/// Stateless JWT codec over shared key material
#[derive(Debug, Clone)]
pub struct ClaimsCodec {
    keys: Arc<KeyMaterial>,
    identity_validation: Validation,
    refresh_validation: Validation,
    admin_role_id: u32,
    leeway_seconds: u64,
}

impl ClaimsCodec {
    pub fn new(keys: Arc<KeyMaterial>, admin_role_id: u32, leeway_seconds: u64) -> Self {
        Self {
            keys,
            identity_validation: validation_for(Algorithm::RS256),
            refresh_validation: validation_for(Algorithm::HS256),
            admin_role_id,
            leeway_seconds,
        }
    }

    /// Signs an identity token for `account` valid for `ttl`
    pub fn sign_identity_token(
        &self,
        account: &AccountIdentity,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let claims =
            IdentityClaims::new(*account, ttl).ok_or_else(|| TokenError::SigningFailed {
                message: format!("identity token expiry out of range: {}", ttl),
            })?;
        encode(
            &Header::new(Algorithm::RS256),
            &claims,
            self.keys.private_signing_key(),
        )
        .map_err(|e| TokenError::SigningFailed {
            message: format!("identity token: {}", e),
        })
    }

    /// Signs a refresh token with a fresh token id
    ///
    /// The returned `expires_in` is the remaining lifetime and is meant to be
    /// used as the TTL of the session record.
    pub fn sign_refresh_token(
        &self,
        account_id: Uuid,
        role_id: u32,
        ttl: Duration,
    ) -> Result<SignedRefreshToken, TokenError> {
        let claims =
            RefreshClaims::new(account_id, role_id, ttl).ok_or_else(|| TokenError::SigningFailed {
                message: format!("refresh token expiry out of range: {}", ttl),
            })?;
        let signed_string = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            self.keys.refresh_encoding_key(),
        )
        .map_err(|e| TokenError::SigningFailed {
            message: format!("refresh token: {}", e),
        })?;

        let expires_in = ttl.to_std().map_err(|e| TokenError::SigningFailed {
            message: format!("refresh token ttl: {}", e),
        })?;

        Ok(SignedRefreshToken {
            signed_string,
            id: claims.jti,
            expires_in,
        })
    }

    /// Verifies `token` as the given kind and applies the role requirement
    ///
    /// Checks run in order: signature and shape, then expiry, then role.
    pub fn parse(
        &self,
        kind: TokenKind,
        requirement: RoleRequirement,
        token: &str,
    ) -> Result<VerifiedClaims, TokenError> {
        let claims = match kind {
            TokenKind::Identity => VerifiedClaims::Identity(self.decode_claims(
                token,
                self.keys.public_verifying_key(),
                &self.identity_validation,
            )?),
            TokenKind::Refresh => VerifiedClaims::Refresh(self.decode_claims(
                token,
                self.keys.refresh_decoding_key(),
                &self.refresh_validation,
            )?),
        };

        if claims.is_expired_at(Utc::now().timestamp(), self.leeway_seconds) {
            debug!("Rejected expired {:?} token", kind);
            return Err(TokenError::Expired);
        }

        if requirement == RoleRequirement::Admin && claims.role_id() != self.admin_role_id {
            debug!("Rejected {:?} token with role {}", kind, claims.role_id());
            return Err(TokenError::InsufficientRole);
        }

        Ok(claims)
    }

    pub fn parse_identity_token(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        self.parse(TokenKind::Identity, RoleRequirement::Any, token)
            .and_then(expect_identity)
    }

    pub fn parse_admin_identity_token(&self, token: &str) -> Result<IdentityClaims, TokenError> {
        self.parse(TokenKind::Identity, RoleRequirement::Admin, token)
            .and_then(expect_identity)
    }

    pub fn parse_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.parse(TokenKind::Refresh, RoleRequirement::Any, token)
            .and_then(expect_refresh)
    }

    pub fn parse_admin_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.parse(TokenKind::Refresh, RoleRequirement::Admin, token)
            .and_then(expect_refresh)
    }

    pub fn admin_role_id(&self) -> u32 {
        self.admin_role_id
    }

    fn decode_claims<T: DeserializeOwned>(
        &self,
        token: &str,
        key: &DecodingKey,
        validation: &Validation,
    ) -> Result<T, TokenError> {
        decode::<T>(token, key, validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => {
                    debug!("Token verification failed: {}", e);
                    TokenError::InvalidSignature
                }
            })
    }
}

// Expiry is checked by `VerifiedClaims::is_expired_at`, which treats a token
// as expired at `exp` itself.
fn validation_for(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = false;
    validation.leeway = 0;
    validation
}

fn expect_identity(claims: VerifiedClaims) -> Result<IdentityClaims, TokenError> {
    claims.into_identity().ok_or(TokenError::InvalidSignature)
}

fn expect_refresh(claims: VerifiedClaims) -> Result<RefreshClaims, TokenError> {
    claims.into_refresh().ok_or(TokenError::InvalidSignature)
}
