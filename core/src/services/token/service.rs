//! Token lifecycle manager: issuance, validation, rotation and revocation

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::entities::{
    account_key_prefix, session_key, AccountIdentity, RefreshTokenSession, TokenPair,
};
use crate::errors::{DomainError, TokenError};
use crate::repositories::SessionStore;

use super::codec::ClaimsCodec;
use super::config::TokenLifecycleConfig;
use super::context::RequestContext;
use super::key_manager::KeyMaterial;

/// Issues, validates, rotates and revokes credentials
///
/// The manager holds no locks of its own. Rotation safety comes from the
/// store's atomic single-key delete: of two concurrent rotations presenting
/// the same refresh token, only one sees a deletion count of 1.
pub struct TokenLifecycleManager<S: SessionStore> {
    store: S,
    codec: ClaimsCodec,
    config: TokenLifecycleConfig,
}

impl<S: SessionStore> TokenLifecycleManager<S> {
    /// Creates a manager over `store` using `keys`
    ///
    /// # Returns
    ///
    /// * `Ok(TokenLifecycleManager)` - Ready to serve requests
    /// * `Err(DomainError::Config)` - Token lifetimes are not positive
    pub fn new(
        store: S,
        keys: Arc<KeyMaterial>,
        config: TokenLifecycleConfig,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let codec = ClaimsCodec::new(keys, config.admin_role_id, config.leeway_seconds);
        Ok(Self {
            store,
            codec,
            config,
        })
    }

    /// Issues a new identity/refresh token pair for `account`
    ///
    /// When `previous_token_id` is given, the previous session is deleted
    /// first. If it no longer exists the token was already rotated or revoked,
    /// so issuance is refused with `InvalidRefreshToken`. The new session is
    /// stored last; a pair is only returned once its session is persisted.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Deadline and cancel signal bounding the store calls
    /// * `account` - Account the pair is issued to
    /// * `previous_token_id` - Id of the refresh token being rotated, if any
    ///
    /// # Returns
    ///
    /// * `Ok(TokenPair)` - Newly issued pair
    /// * `Err(DomainError::Token(InvalidRefreshToken))` - Previous session missing (replay)
    /// * `Err(DomainError::Internal)` - Signing or store failure
    /// * `Err(DomainError::Canceled)` - Context expired or canceled
    pub async fn issue_pair(
        &self,
        ctx: &RequestContext,
        account: &AccountIdentity,
        previous_token_id: Option<Uuid>,
    ) -> Result<TokenPair, DomainError> {
        ctx.check()?;

        if let Some(previous) = previous_token_id {
            let key = session_key(account.id, previous);
            let deleted = ctx
                .run(self.store.delete(&key))
                .await
                .map_err(|e| store_failure("delete previous session", e))?;

            if deleted == 0 {
                warn!(
                    "Refresh session {} of account {} is gone; refusing to issue a new pair",
                    previous, account.id
                );
                return Err(TokenError::InvalidRefreshToken.into());
            }
            debug!("Consumed refresh session {} of account {}", previous, account.id);
        }

        let identity_token = self
            .codec
            .sign_identity_token(account, self.config.id_token_ttl())
            .map_err(signing_failure)?;

        let refresh = self
            .codec
            .sign_refresh_token(account.id, account.role_id, self.config.refresh_token_ttl())
            .map_err(signing_failure)?;

        ctx.run(
            self.store
                .put(&session_key(account.id, refresh.id), refresh.expires_in),
        )
        .await
        .map_err(|e| store_failure("store new session", e))?;

        info!(
            "Issued token pair for account {} (session {})",
            account.id, refresh.id
        );

        Ok(TokenPair {
            identity_token,
            refresh_token: refresh.signed_string,
            refresh_token_id: refresh.id,
            account_id: account.id,
            identity_expires_in: self.config.id_token_expiry_seconds,
            refresh_expires_in: self.config.refresh_token_expiry_seconds,
        })
    }

    /// Verifies an identity token and returns the account snapshot it carries
    ///
    /// Identity tokens cannot be revoked before they expire; this never
    /// touches the store.
    pub fn validate(&self, identity_token: &str) -> Result<AccountIdentity, DomainError> {
        let claims = self.codec.parse_identity_token(identity_token)?;
        Ok(claims.account)
    }

    /// Like [`validate`](Self::validate), but also requires the administrator role
    pub fn validate_admin(&self, identity_token: &str) -> Result<AccountIdentity, DomainError> {
        let claims = self.codec.parse_admin_identity_token(identity_token)?;
        Ok(claims.account)
    }

    /// Verifies a refresh token without consulting the store
    pub fn validate_refresh(&self, refresh_token: &str) -> Result<RefreshTokenSession, DomainError> {
        let claims = self.codec.parse_refresh_token(refresh_token)?;
        Ok(RefreshTokenSession::from((refresh_token.to_string(), claims)))
    }

    /// Like [`validate_refresh`](Self::validate_refresh), but also requires
    /// the administrator role
    pub fn validate_admin_refresh(
        &self,
        refresh_token: &str,
    ) -> Result<RefreshTokenSession, DomainError> {
        let claims = self.codec.parse_admin_refresh_token(refresh_token)?;
        Ok(RefreshTokenSession::from((refresh_token.to_string(), claims)))
    }

    /// Exchanges a refresh token for a new pair
    ///
    /// The token must verify and belong to `account`. Its session is consumed,
    /// so presenting the same token again fails with `InvalidRefreshToken`.
    pub async fn rotate(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
        account: &AccountIdentity,
    ) -> Result<TokenPair, DomainError> {
        let session = self.validate_refresh(refresh_token)?;

        if session.account_id != account.id {
            warn!(
                "Refresh token of account {} presented for account {}",
                session.account_id, account.id
            );
            return Err(TokenError::InvalidRefreshToken.into());
        }

        self.issue_pair(ctx, account, Some(session.id)).await
    }

    /// Revokes a single session
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Session existed and was revoked
    /// * `Ok(false)` - Session was already gone
    pub async fn revoke_session(
        &self,
        ctx: &RequestContext,
        account_id: Uuid,
        token_id: Uuid,
    ) -> Result<bool, DomainError> {
        let deleted = ctx
            .run(self.store.delete(&session_key(account_id, token_id)))
            .await
            .map_err(|e| store_failure("revoke session", e))?;

        if deleted > 0 {
            info!("Revoked session {} of account {}", token_id, account_id);
        }
        Ok(deleted > 0)
    }

    /// Revokes every session of `account_id`
    ///
    /// Best effort: a failed deletion does not stop the sweep. Sessions created
    /// while the sweep runs may survive it.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of sessions revoked
    /// * `Err(DomainError::PartialRevocation)` - Some deletions failed; the rest were attempted
    /// * `Err(DomainError::Canceled)` - Context expired or canceled mid-sweep
    pub async fn revoke_all(
        &self,
        ctx: &RequestContext,
        account_id: Uuid,
    ) -> Result<usize, DomainError> {
        let (revoked, failed) = ctx.run(self.sweep_sessions(account_id)).await?;

        if failed > 0 {
            error!(
                "Revocation of account {} incomplete: {} revoked, {} failed",
                account_id, revoked, failed
            );
            return Err(DomainError::PartialRevocation { revoked, failed });
        }

        info!("Revoked {} sessions of account {}", revoked, account_id);
        Ok(revoked)
    }

    async fn sweep_sessions(&self, account_id: Uuid) -> Result<(usize, usize), DomainError> {
        let prefix = account_key_prefix(account_id);
        let mut keys = self.store.scan_prefix(&prefix);
        let (mut revoked, mut failed) = (0usize, 0usize);

        while let Some(key) = keys.next().await {
            let key = match key {
                Ok(key) => key,
                Err(DomainError::Canceled) => return Err(DomainError::Canceled),
                Err(e) => {
                    error!("Session scan for account {} failed: {}", account_id, e);
                    failed += 1;
                    continue;
                }
            };

            match self.store.delete(&key).await {
                Ok(count) => revoked += count as usize,
                Err(DomainError::Canceled) => return Err(DomainError::Canceled),
                Err(e) => {
                    warn!("Failed to delete session key '{}': {}", key, e);
                    failed += 1;
                }
            }
        }

        Ok((revoked, failed))
    }

    /// Closes the underlying store
    pub async fn close(&self) -> Result<(), DomainError> {
        self.store.close().await
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn codec(&self) -> &ClaimsCodec {
        &self.codec
    }

    pub fn config(&self) -> &TokenLifecycleConfig {
        &self.config
    }
}

fn signing_failure(err: TokenError) -> DomainError {
    error!("Token signing failed: {}", err);
    DomainError::internal(err)
}

fn store_failure(operation: &str, err: DomainError) -> DomainError {
    match err {
        DomainError::Canceled => DomainError::Canceled,
        other => {
            error!("Session store failed to {}: {}", operation, other);
            DomainError::internal(format!("{}: {}", operation, other))
        }
    }
}
