//! Domain-specific error types and error handling.

mod types;

#[cfg(test)]
mod tests;

pub use types::TokenError;

use gp_shared::errors::{ErrorResponse, IntoErrorResponse};
use thiserror::Error;

/// Errors surfaced by the token services
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Key material error: {message}")]
    KeyMaterial { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Revocation incomplete: {revoked} sessions revoked, {failed} deletions failed")]
    PartialRevocation { revoked: usize, failed: usize },

    #[error("Operation canceled")]
    Canceled,

    // Bridge to specific error types
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl DomainError {
    /// Creates an internal error from any displayable cause
    pub fn internal(message: impl std::fmt::Display) -> Self {
        DomainError::Internal {
            message: message.to_string(),
        }
    }

    /// Whether the caller presented a bad credential (4xx) rather than hitting
    /// an unhealthy system (5xx)
    pub fn is_authorization_failure(&self) -> bool {
        match self {
            DomainError::Token(err) => err.is_credential_failure(),
            _ => false,
        }
    }

    /// HTTP status the transport layer should answer with
    pub fn status_code(&self) -> u16 {
        if self.is_authorization_failure() {
            401
        } else {
            500
        }
    }
}

impl IntoErrorResponse for DomainError {
    fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse::from(self)
    }
}

impl From<&DomainError> for ErrorResponse {
    fn from(err: &DomainError) -> Self {
        if err.is_authorization_failure() {
            ErrorResponse::unauthorized()
        } else {
            ErrorResponse::internal()
        }
    }
}
