//! Credential and codec error types
//!
//! The display strings are for server-side logs only. Clients receive the uniform
//! message produced by the `ErrorResponse` conversion so that the exact cause of a
//! rejected credential is never revealed.

use thiserror::Error;

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token signature verification failed")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Account role is not allowed to use this token")]
    InsufficientRole,

    #[error("Refresh token session does not exist")]
    InvalidRefreshToken,

    #[error("Authorization header must have the form `Bearer {{token}}`")]
    MalformedAuthorizationHeader,

    #[error("Token signing failed: {message}")]
    SigningFailed { message: String },
}

impl TokenError {
    /// Whether the error means the presented credential is unacceptable
    ///
    /// Signing failures are a server-side fault and classify as internal.
    pub fn is_credential_failure(&self) -> bool {
        !matches!(self, TokenError::SigningFailed { .. })
    }
}
